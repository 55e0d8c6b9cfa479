use crate::model::Value;
use crate::transpiler::errors::ScriptError;

/// Largest list `range()` will build.
pub const MAX_RANGE: usize = 100_000;

fn arity(name: &str, args: &[Value], min: usize, max: usize, expected: &'static str) -> Result<(), ScriptError> {
    if args.len() < min || args.len() > max {
        return Err(ScriptError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn bad_argument(name: &str, message: impl Into<String>) -> ScriptError {
    ScriptError::BadArgument {
        name: name.to_string(),
        message: message.into(),
    }
}

fn text_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::to_text).unwrap_or_default()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Calls a builtin by name. Method calls (`x.f(y)`) arrive here with the
/// receiver as the first argument.
pub fn call(name: &str, args: Vec<Value>) -> Result<Value, ScriptError> {
    match name {
        "upper" | "toUpperCase" => {
            arity(name, &args, 1, 1, "1")?;
            Ok(Value::String(text_arg(&args, 0).to_uppercase()))
        }
        "lower" | "toLowerCase" => {
            arity(name, &args, 1, 1, "1")?;
            Ok(Value::String(text_arg(&args, 0).to_lowercase()))
        }
        "trim" => {
            arity(name, &args, 1, 1, "1")?;
            Ok(Value::String(text_arg(&args, 0).trim().to_string()))
        }
        "capitalize" => {
            arity(name, &args, 1, 1, "1")?;
            Ok(Value::String(capitalize(&text_arg(&args, 0))))
        }
        "len" | "length" => {
            arity(name, &args, 1, 1, "1")?;
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                Value::Undefined => 0,
                other => return Err(bad_argument(name, format!("{} has no length", other.type_name()))),
            };
            Ok(Value::Number(len as f64))
        }
        "join" => {
            arity(name, &args, 1, 2, "1 or 2")?;
            let separator = if args.len() == 2 { text_arg(&args, 1) } else { ",".to_string() };
            match &args[0] {
                Value::List(items) => Ok(Value::String(
                    items.iter().map(Value::to_text).collect::<Vec<_>>().join(&separator),
                )),
                other => Err(bad_argument(name, format!("expected a list, got {}", other.type_name()))),
            }
        }
        "split" => {
            arity(name, &args, 2, 2, "2")?;
            let text = text_arg(&args, 0);
            let separator = text_arg(&args, 1);
            let parts = if separator.is_empty() {
                text.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                text.split(separator.as_str()).map(Value::from).collect()
            };
            Ok(Value::List(parts))
        }
        "keys" | "values" => {
            arity(name, &args, 1, 1, "1")?;
            match &args[0] {
                Value::Map(map) if name == "keys" => {
                    Ok(Value::List(map.keys().map(|k| Value::String(k.clone())).collect()))
                }
                Value::Map(map) => Ok(Value::List(map.values().cloned().collect())),
                Value::Undefined => Ok(Value::List(Vec::new())),
                other => Err(bad_argument(name, format!("expected an object, got {}", other.type_name()))),
            }
        }
        "contains" | "includes" => {
            arity(name, &args, 2, 2, "2")?;
            let found = match (&args[0], &args[1]) {
                (Value::List(items), needle) => items.contains(needle),
                (Value::Map(map), key) => map.contains_key(&key.to_text()),
                (Value::String(s), needle) => s.contains(&needle.to_text()),
                _ => false,
            };
            Ok(Value::Bool(found))
        }
        "startsWith" => {
            arity(name, &args, 2, 2, "2")?;
            Ok(Value::Bool(text_arg(&args, 0).starts_with(&text_arg(&args, 1))))
        }
        "endsWith" => {
            arity(name, &args, 2, 2, "2")?;
            Ok(Value::Bool(text_arg(&args, 0).ends_with(&text_arg(&args, 1))))
        }
        "replace" => {
            arity(name, &args, 3, 3, "3")?;
            let from = text_arg(&args, 1);
            if from.is_empty() {
                return Err(bad_argument(name, "pattern must not be empty"));
            }
            Ok(Value::String(text_arg(&args, 0).replace(&from, &text_arg(&args, 2))))
        }
        "str" | "String" => {
            arity(name, &args, 1, 1, "1")?;
            Ok(Value::String(text_arg(&args, 0)))
        }
        "num" | "Number" => {
            arity(name, &args, 1, 1, "1")?;
            match &args[0] {
                Value::Number(n) => Ok(Value::Number(*n)),
                Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Number)
                    .map_err(|_| bad_argument(name, format!("'{}' is not a number", s))),
                other => Err(bad_argument(name, format!("cannot convert {} to a number", other.type_name()))),
            }
        }
        "default" => {
            arity(name, &args, 2, 2, "2")?;
            let mut args = args.into_iter();
            let value = args.next().unwrap_or_default();
            let fallback = args.next().unwrap_or_default();
            Ok(if value == Value::Undefined { fallback } else { value })
        }
        "push" => {
            if args.is_empty() {
                return Err(ScriptError::Arity {
                    name: name.to_string(),
                    expected: "at least 1",
                    got: 0,
                });
            }
            let mut args = args.into_iter();
            let mut items = match args.next() {
                Some(Value::List(items)) => items,
                Some(Value::Undefined) | None => Vec::new(),
                Some(other) => {
                    return Err(bad_argument(name, format!("expected a list, got {}", other.type_name())));
                }
            };
            items.extend(args);
            Ok(Value::List(items))
        }
        "range" => {
            arity(name, &args, 1, 1, "1")?;
            match &args[0] {
                Value::Number(n) if *n > MAX_RANGE as f64 => {
                    Err(bad_argument(name, format!("{} exceeds the limit of {}", n, MAX_RANGE)))
                }
                Value::Number(n) if *n >= 0.0 => {
                    Ok(Value::List((0..*n as usize).map(|i| Value::Number(i as f64)).collect()))
                }
                other => Err(bad_argument(name, format!("expected a non-negative number, got {}", other.type_name()))),
            }
        }
        "json" => {
            arity(name, &args, 1, 1, "1")?;
            serde_json::to_string(&args[0])
                .map(Value::String)
                .map_err(|e| bad_argument(name, e.to_string()))
        }
        _ => Err(ScriptError::UnknownFunction(name.to_string())),
    }
}
