use crate::model::Value;
use crate::transpiler::errors::ScriptError;
use crate::transpiler::script::builtins;
use crate::transpiler::script::syntax::{BinaryOp, Expr, PathSegment, Place, Stmt, UnaryOp};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Deepest expression nesting evaluated before giving up.
pub const MAX_EVAL_DEPTH: usize = 256;

/// Tree-walking evaluator for parsed programs.
///
/// Frame 0 holds the bindings supplied by the caller; blocks and loop
/// iterations push their own frames. Everything written by `Emit` and
/// `Chunk` statements accumulates in the output buffer.
pub struct Evaluator<'a> {
    frames: Vec<HashMap<String, Value>>,
    chunks: &'a [String],
    output: String,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(bindings: HashMap<String, Value>) -> Self {
        Self::with_chunks(bindings, &[])
    }

    pub fn with_chunks(bindings: HashMap<String, Value>, chunks: &'a [String]) -> Self {
        Self {
            frames: vec![bindings],
            chunks,
            output: String::new(),
            depth: 0,
        }
    }

    pub fn run(&mut self, program: &[Stmt]) -> Result<(), ScriptError> {
        for stmt in program {
            self.exec(stmt)?;
        }
        Ok(())
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Removes a binding from the caller-supplied frame.
    pub fn take_binding(&mut self, name: &str) -> Option<Value> {
        self.frames.first_mut()?.remove(name)
    }

    fn scoped<F>(&mut self, frame: HashMap<String, Value>, body: F) -> Result<(), ScriptError>
    where
        F: FnOnce(&mut Self) -> Result<(), ScriptError>,
    {
        self.frames.push(frame);
        let result = body(self);
        self.frames.pop();
        result
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        match stmt {
            Stmt::Let(name, expr) => {
                let value = self.eval(expr)?;
                if let Some(frame) = self.frames.last_mut() {
                    frame.insert(name.clone(), value);
                }
                Ok(())
            }
            Stmt::Assign(place, expr) => {
                let value = self.eval(expr)?;
                self.assign(place, value)
            }
            Stmt::If(condition, then, otherwise) => {
                let branch = if self.eval(condition)?.is_truthy() {
                    then
                } else {
                    otherwise
                };
                self.scoped(HashMap::new(), |ev| ev.run(branch))
            }
            Stmt::For(var, iterable, body) => {
                let items = match self.eval(iterable)? {
                    Value::List(items) => items,
                    Value::Map(map) => map.into_keys().map(Value::String).collect(),
                    Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
                    Value::Undefined => Vec::new(),
                    other => return Err(ScriptError::NotIterable(other.type_name())),
                };
                for item in items {
                    let frame = HashMap::from([(var.clone(), item)]);
                    self.scoped(frame, |ev| ev.run(body))?;
                }
                Ok(())
            }
            Stmt::Expr(expr) => self.eval(expr).map(|_| ()),
            Stmt::Emit(expr) => {
                let value = self.eval(expr)?;
                self.output.push_str(&value.to_text());
                Ok(())
            }
            Stmt::Chunk(index) => {
                let chunk = self
                    .chunks
                    .get(*index)
                    .ok_or(ScriptError::UnknownChunk(*index))?;
                self.output.push_str(chunk);
                Ok(())
            }
        }
    }

    fn assign(&mut self, place: &Place, value: Value) -> Result<(), ScriptError> {
        let mut keys = Vec::with_capacity(place.path.len());
        for segment in &place.path {
            keys.push(match segment {
                PathSegment::Key(key) => Value::String(key.clone()),
                PathSegment::Index(expr) => self.eval(expr)?,
            });
        }

        if !self.frames.iter().any(|frame| frame.contains_key(&place.root)) {
            if keys.is_empty() {
                // Unbound plain names become caller-level bindings.
                self.frames[0].insert(place.root.clone(), value);
                return Ok(());
            }
            return Err(ScriptError::InvalidAssignment {
                target: place.root.clone(),
                reason: "variable is not defined".to_string(),
            });
        }

        let slot = self
            .frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(&place.root))
            .ok_or_else(|| ScriptError::InvalidAssignment {
                target: place.root.clone(),
                reason: "variable is not defined".to_string(),
            })?;

        assign_path(slot, &keys, value, &place.root)
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(ScriptError::NestingTooDeep(MAX_EVAL_DEPTH));
        }
        self.depth += 1;
        let value = self.eval_expr(expr);
        self.depth -= 1;
        value
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => Ok(self.lookup(name).cloned().unwrap_or_default()),
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            }
            Expr::Object(fields) => {
                let mut map = IndexMap::with_capacity(fields.len());
                for (key, expr) in fields {
                    let value = self.eval(expr)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Map(map))
            }
            Expr::Member(base, name) => {
                let base = self.eval(base)?;
                Ok(member(&base, name))
            }
            Expr::Index(base, index) => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                Ok(index_value(&base, &index))
            }
            Expr::Call(callee, args) => self.call(callee, args),
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(ScriptError::InvalidOperand {
                            op: "-",
                            operand: other.type_name(),
                        }),
                    },
                }
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() { Ok(left) } else { self.eval(right) }
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() { self.eval(right) } else { Ok(left) }
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
            Expr::Cond(condition, then, otherwise) => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, ScriptError> {
        let (name, mut values) = match callee {
            Expr::Var(name) => (name.as_str(), Vec::with_capacity(args.len())),
            // Method calls pass the receiver as the first argument.
            Expr::Member(receiver, name) => {
                let mut values = Vec::with_capacity(args.len() + 1);
                values.push(self.eval(receiver)?);
                if name == "push" {
                    for arg in args {
                        values.push(self.eval(arg)?);
                    }
                    return self.push_in_place(receiver, values);
                }
                (name.as_str(), values)
            }
            other => {
                let value = self.eval(other)?;
                return Err(ScriptError::NotCallable(value.type_name()));
            }
        };
        for arg in args {
            values.push(self.eval(arg)?);
        }
        builtins::call(name, values)
    }

    /// `xs.push(a, b)` appends to the list stored at `xs` and yields the new
    /// length. Receivers that are not assignable are extended and dropped.
    fn push_in_place(&mut self, receiver: &Expr, values: Vec<Value>) -> Result<Value, ScriptError> {
        let list = builtins::call("push", values)?;
        let len = list_len(&list);
        if let Some(place) = Place::from_expr(receiver.clone()) {
            self.assign(&place, list)?;
        }
        Ok(Value::Number(len as f64))
    }
}

fn list_len(value: &Value) -> usize {
    match value {
        Value::List(items) => items.len(),
        _ => 0,
    }
}

fn member(base: &Value, name: &str) -> Value {
    match (base, name) {
        (Value::Map(map), _) => map.get(name).cloned().unwrap_or_default(),
        (Value::String(s), "length") => Value::Number(s.chars().count() as f64),
        (Value::List(items), "length") => Value::Number(items.len() as f64),
        _ => Value::Undefined,
    }
}

fn as_position(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn index_value(base: &Value, index: &Value) -> Value {
    match (base, index) {
        (Value::List(items), Value::Number(n)) => as_position(*n)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default(),
        (Value::String(s), Value::Number(n)) => as_position(*n)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        (Value::Map(_), key) | (Value::String(_), key) | (Value::List(_), key) => {
            member(base, &key.to_text())
        }
        _ => Value::Undefined,
    }
}

fn assign_path(slot: &mut Value, keys: &[Value], value: Value, target: &str) -> Result<(), ScriptError> {
    let Some((key, rest)) = keys.split_first() else {
        *slot = value;
        return Ok(());
    };

    let invalid = |reason: String| ScriptError::InvalidAssignment {
        target: target.to_string(),
        reason,
    };

    match (slot, key) {
        (Value::List(items), Value::Number(n)) => {
            let position = as_position(*n)
                .ok_or_else(|| invalid(format!("{} is not a valid list index", n)))?;
            if position < items.len() {
                assign_path(&mut items[position], rest, value, target)
            } else if position == items.len() && rest.is_empty() {
                items.push(value);
                Ok(())
            } else {
                Err(invalid(format!("index {} is out of range", position)))
            }
        }
        (Value::Map(map), key) => {
            let entry = map.entry(key.to_text()).or_default();
            assign_path(entry, rest, value, target)
        }
        (other, key) => Err(invalid(format!(
            "cannot set property '{}' of {}",
            key.to_text(),
            other.type_name()
        ))),
    }
}

fn numbers(op: BinaryOp, left: &Value, right: &Value) -> Result<(f64, f64), ScriptError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(ScriptError::TypeMismatch {
            op: op.symbol(),
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ScriptError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => {
                    return Err(ScriptError::TypeMismatch {
                        op: op.symbol(),
                        left: left.type_name(),
                        right: right.type_name(),
                    });
                }
            };
            let result = match ordering {
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::LtEq => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
                None => false,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Ok(Value::List(a))
            }
            (left @ Value::String(_), right) | (left, right @ Value::String(_)) => {
                Ok(Value::String(left.to_text() + &right.to_text()))
            }
            (left, right) => Err(ScriptError::TypeMismatch {
                op: op.symbol(),
                left: left.type_name(),
                right: right.type_name(),
            }),
        },
        BinaryOp::Sub => numbers(op, &left, &right).map(|(a, b)| Value::Number(a - b)),
        BinaryOp::Mul => numbers(op, &left, &right).map(|(a, b)| Value::Number(a * b)),
        BinaryOp::Div | BinaryOp::Rem => {
            let (a, b) = numbers(op, &left, &right)?;
            if b == 0.0 {
                return Err(ScriptError::DivisionByZero);
            }
            Ok(Value::Number(if op == BinaryOp::Div { a / b } else { a % b }))
        }
        BinaryOp::Or => Ok(if left.is_truthy() { left } else { right }),
        BinaryOp::And => Ok(if left.is_truthy() { right } else { left }),
    }
}
