#[cfg(test)]
mod tests {
    use crate::model::*;
    use indexmap::IndexMap;

    #[test]
    fn test_model_value_carries_type_first() {
        let mut model = Model::new("Greeting");
        model.set_string("name", "World");

        let value = model.to_value();
        let map = value.as_map().expect("model should convert to a map");
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["$type", "name"]);
        assert_eq!(map["$type"], Value::from("Greeting"));
    }

    #[test]
    fn test_from_value_keeps_origin_type_when_missing() {
        let origin = Model::new("Greeting");
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::from("Rust"));

        let model = Model::from_value(Value::Map(map), &origin).unwrap();
        assert_eq!(model.node_type, "Greeting");
        assert_eq!(model.get_string("name"), Some("Rust"));
    }

    #[test]
    fn test_from_value_rejects_non_map() {
        let origin = Model::new("Greeting");
        assert!(Model::from_value(Value::from("nope"), &origin).is_none());
    }

    #[test]
    fn test_model_serializes_with_reserved_keys() {
        let mut model = Model::new("Entity");
        model.container_property = Some("entities".to_string());
        model.set_string("name", "Person");

        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["$type"], "Entity");
        assert_eq!(json["$containerProperty"], "entities");
        assert_eq!(json["name"], "Person");
        assert!(json.get("$container").is_none());
    }

    #[test]
    fn test_display_tree() {
        let mut model = Model::new("Greeting");
        model.set_string("name", "World");
        model.set("count", Value::Number(3.0));

        let rendered = model.to_string();
        assert_eq!(rendered, "Greeting\n├── name: \"World\"\n└── count: 3");
    }

    #[test]
    fn test_arena_container_is_a_relation() {
        let mut arena = ModelArena::new();
        let root = arena.insert(Model::new("Domain"));
        let child = arena.insert(Model::new("Entity"));
        let other = arena.insert(Model::new("Entity"));

        assert!(arena.attach(child, root, "entities"));
        assert!(arena.attach(other, root, "entities"));
        assert!(!arena.attach(root, root, "self"));

        let container = arena.container_of(child).expect("child should have a container");
        assert_eq!(container.node_type, "Domain");
        assert_eq!(
            arena.get(child).unwrap().container_property.as_deref(),
            Some("entities")
        );
        assert!(arena.container_of(root).is_none());

        let children: Vec<NodeId> = arena.children_of(root).map(|(id, _)| id).collect();
        assert_eq!(children, vec![child, other]);
    }

    #[test]
    fn test_value_text_coercion() {
        assert_eq!(Value::Undefined.to_text(), "");
        assert_eq!(Value::Number(42.0).to_text(), "42");
        assert_eq!(Value::Number(1.5).to_text(), "1.5");
        assert_eq!(
            Value::List(vec![Value::from("a"), Value::Number(2.0)]).to_text(),
            "a,2"
        );
        assert!(!Value::from("").is_truthy());
        assert!(Value::List(Vec::new()).is_truthy());
    }

    #[test]
    fn test_number_text_follows_javascript() {
        let text = |n: f64| Value::Number(n).to_text();

        assert_eq!(text(1e15), "1000000000000000");
        assert_eq!(text(1e20), "100000000000000000000");
        assert_eq!(text(1e21), "1e+21");
        assert_eq!(text(-2.5e22), "-2.5e+22");
        assert_eq!(text(1e-7), "1e-7");
        assert_eq!(text(0.000001), "0.000001");
        assert_eq!(text(-0.0), "0");
        assert_eq!(text(f64::NAN), "NaN");
        assert_eq!(text(f64::INFINITY), "Infinity");
        assert_eq!(text(f64::NEG_INFINITY), "-Infinity");
    }
}
