//! The small language shared by templates and selectors.
//!
//! It covers expressions, `let`, assignments, `if`/`else` and `for` loops
//! over lists, object keys and string characters. There is no access to the
//! host: scripts can only read and rewrite the values bound for them.

pub mod builtins;
pub mod eval;
pub mod parser;
pub mod syntax;

pub use eval::Evaluator;
pub use parser::{parse_expression, parse_program};
pub use syntax::{Expr, Program, Stmt};

use crate::model::Value;
use crate::transpiler::errors::ScriptError;
use std::collections::HashMap;

/// Parses and evaluates a single expression against `bindings`.
pub fn evaluate(source: &str, bindings: HashMap<String, Value>) -> Result<Value, ScriptError> {
    let expr = parse_expression(source)?;
    Evaluator::new(bindings).eval(&expr)
}
