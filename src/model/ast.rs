use crate::model::value::Value;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

pub const TYPE_KEY: &str = "$type";
pub const CONTAINER_KEY: &str = "$container";
pub const CONTAINER_PROPERTY_KEY: &str = "$containerProperty";

/// Index of a node inside a [`ModelArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A node produced by interpreting input text against a grammar.
///
/// `$type` and `$containerProperty` serialize alongside the regular
/// properties. The container link is a relation only: it names a slot in the
/// arena that owns both nodes and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    #[serde(rename = "$type")]
    pub node_type: String,
    #[serde(skip)]
    pub container: Option<NodeId>,
    #[serde(rename = "$containerProperty", skip_serializing_if = "Option::is_none")]
    pub container_property: Option<String>,
    #[serde(flatten)]
    pub properties: IndexMap<String, Value>,
}

impl Model {
    pub fn new(node_type: &str) -> Self {
        Self {
            node_type: node_type.to_string(),
            container: None,
            container_property: None,
            properties: IndexMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.properties.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.set(key, Value::String(value.to_string()));
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// The model as a script value: a map holding `$type`, the container
    /// property when set, then every property in insertion order.
    pub fn to_value(&self) -> Value {
        let mut map = IndexMap::with_capacity(self.properties.len() + 2);
        map.insert(TYPE_KEY.to_string(), Value::String(self.node_type.clone()));
        if let Some(property) = &self.container_property {
            map.insert(
                CONTAINER_PROPERTY_KEY.to_string(),
                Value::String(property.clone()),
            );
        }
        for (key, value) in &self.properties {
            map.insert(key.clone(), value.clone());
        }
        Value::Map(map)
    }

    /// Rebuilds a model from a script value.
    ///
    /// Returns `None` unless the value is a map. A missing or non-string
    /// `$type` falls back to `origin`'s type, and the container link is kept
    /// from `origin` since scripts cannot see it.
    pub fn from_value(value: Value, origin: &Model) -> Option<Model> {
        let Value::Map(mut map) = value else {
            return None;
        };

        let node_type = match map.shift_remove(TYPE_KEY) {
            Some(Value::String(name)) => name,
            _ => origin.node_type.clone(),
        };
        let container_property = match map.shift_remove(CONTAINER_PROPERTY_KEY) {
            Some(Value::String(property)) => Some(property),
            _ => None,
        };
        map.shift_remove(CONTAINER_KEY);

        Some(Model {
            node_type,
            container: origin.container,
            container_property,
            properties: map,
        })
    }
}

impl Model {
    fn display_tree(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.node_type)?;
        if let Some(property) = &self.container_property {
            write!(f, " (in \"{}\")", property)?;
        }

        let count = self.properties.len();
        for (index, (key, value)) in self.properties.iter().enumerate() {
            let connector = if index + 1 == count { "└── " } else { "├── " };
            write!(f, "\n{}{}: ", connector, key)?;
            match value {
                Value::String(s) => write!(f, "\"{}\"", s)?,
                other => write!(f, "{}", other)?,
            }
        }

        Ok(())
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.display_tree(f)
    }
}

/// Owns a set of model nodes and the container relations between them.
#[derive(Debug, Default, Clone)]
pub struct ModelArena {
    nodes: Vec<Model>,
}

impl ModelArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: Model) -> NodeId {
        self.nodes.push(model);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&Model> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Model> {
        self.nodes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records `parent` as the container of `child` under `property`.
    /// Returns false when either id is unknown or both are the same node.
    pub fn attach(&mut self, child: NodeId, parent: NodeId, property: &str) -> bool {
        if child == parent || parent.0 >= self.nodes.len() {
            return false;
        }
        match self.nodes.get_mut(child.0) {
            Some(node) => {
                node.container = Some(parent);
                node.container_property = Some(property.to_string());
                true
            }
            None => false,
        }
    }

    pub fn container_of(&self, id: NodeId) -> Option<&Model> {
        self.get(id)?.container.and_then(|parent| self.get(parent))
    }

    /// Nodes whose container is `parent`, in insertion order.
    pub fn children_of(&self, parent: NodeId) -> impl Iterator<Item = (NodeId, &Model)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.container == Some(parent))
            .map(|(index, node)| (NodeId(index), node))
    }
}
