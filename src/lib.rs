pub mod cli;
pub mod config;
pub mod model;
pub mod transpiler;
pub mod workspace;

// Re-export commonly used types
pub use model::{Model, ModelArena, NodeId, Value};
pub use transpiler::{CodeGenerator, TemplateCache, TemplateEngine, codegen, grammar};
