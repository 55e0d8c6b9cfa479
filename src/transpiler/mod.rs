pub mod codegen;
pub mod errors;
pub mod grammar;
pub mod interpreter;
pub mod script;
pub mod template;
pub mod transform;

pub use codegen::{CodeGenerator, GenerationResult, generate_output_name};
pub use errors::{CodegenError, ScriptError, is_error_output};
pub use grammar::{Grammar, Rule, RuleKind, compile_grammar};
pub use interpreter::InputInterpreter;
pub use template::{TemplateCache, TemplateEngine};
pub use transform::ModelTransformer;

/// Convenience function to run grammar, input, optional selector and
/// template through a fresh generator in one call.
pub fn generate(grammar: &str, input: &str, template: &str, selector: Option<&str>) -> String {
    let mut generator = CodeGenerator::new(TemplateCache::new());
    generator.load_grammar(grammar);
    generator.generate(input, template, selector)
}
