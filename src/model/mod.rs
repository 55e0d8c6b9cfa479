pub mod ast;
pub mod value;
mod tests;

pub use ast::{Model, ModelArena, NodeId};
pub use value::Value;
