use crate::model::Model;
use crate::transpiler::errors::CodegenError;
use crate::transpiler::grammar::Grammar;
use crate::transpiler::interpreter::InputInterpreter;
use crate::transpiler::template::{TemplateCache, TemplateEngine};
use crate::transpiler::transform::ModelTransformer;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub const DEFAULT_OUTPUT_EXTENSION: &str = "txt";

// A trailing ".ext" where ext holds neither '/' nor '.'
static EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.([^/.]+)$").expect("valid extension pattern"));

/// Output file name per batch key, mapped to generated text.
pub type GenerationResult = IndexMap<String, String>;

fn strip_extension(name: &str) -> &str {
    match EXTENSION.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    }
}

/// `<inputBase>.<templateBase>.<templateExt>`, with `txt` when the template
/// name has no extension.
pub fn generate_output_name(input_name: &str, template_name: &str) -> String {
    let input_base = strip_extension(input_name);
    let template_base = strip_extension(template_name);
    let extension = EXTENSION
        .captures(template_name)
        .and_then(|caps| caps.get(1))
        .map_or(DEFAULT_OUTPUT_EXTENSION, |m| m.as_str());

    format!("{}.{}.{}", input_base, template_base, extension)
}

/// Name of the entry recording a failed (input, template) pair.
pub fn error_entry_name(input_name: &str, template_name: &str) -> String {
    format!("error_{}_{}.txt", input_name, template_name)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown failure".to_string())
}

/// Drives parse, transform and render for single files and batches.
#[derive(Debug, Clone, Default)]
pub struct CodeGenerator {
    interpreter: InputInterpreter,
    transformer: ModelTransformer,
    templates: TemplateEngine,
}

impl CodeGenerator {
    pub fn new(cache: TemplateCache) -> Self {
        Self {
            interpreter: InputInterpreter::new(),
            transformer: ModelTransformer::new(),
            templates: TemplateEngine::new(cache),
        }
    }

    /// Compiles `source` and makes it the grammar used for every input.
    pub fn load_grammar(&mut self, source: &str) -> &Grammar {
        self.interpreter.load_grammar(source)
    }

    pub fn grammar(&self) -> Option<&Grammar> {
        self.interpreter.grammar()
    }

    pub fn templates(&self) -> &TemplateEngine {
        &self.templates
    }

    pub fn parse_input(&self, input: &str) -> Result<Model, CodegenError> {
        self.interpreter.parse(input)
    }

    pub fn try_generate(
        &self,
        input: &str,
        template: &str,
        selector: Option<&str>,
    ) -> Result<String, CodegenError> {
        let mut model = self.interpreter.parse(input)?;
        if let Some(selector) = selector {
            model = self.transformer.transform(model, selector);
        }
        self.templates.try_render(template, &model)
    }

    fn generate_unguarded(&self, input: &str, template: &str, selector: Option<&str>) -> String {
        match self.try_generate(input, template, selector) {
            Ok(text) => text,
            Err(CodegenError::NoGrammarLoaded) => {
                tracing::error!("no grammar loaded");
                format!("Error: Failed to parse input - {}", CodegenError::NoGrammarLoaded)
            }
            Err(err) => {
                tracing::error!(error = %err, "code generation failed");
                format!("Error: {}", err)
            }
        }
    }

    /// Generates text for one input and one template. Failures come back
    /// as inline `Error: ...` text, never as a panic or `Err`.
    pub fn generate(&self, input: &str, template: &str, selector: Option<&str>) -> String {
        isolate(|| self.generate_unguarded(input, template, selector)).unwrap_or_else(|message| {
            tracing::error!(error = %message, "code generation panicked");
            format!("Error: Failed to generate code - {}", message)
        })
    }

    /// Applies every template to every input.
    ///
    /// Each pair yields exactly one entry: the generated text under
    /// [`generate_output_name`], or a failure description under
    /// [`error_entry_name`]. A failing pair never stops the others.
    pub fn generate_batch(
        &self,
        inputs: &IndexMap<String, String>,
        templates: &IndexMap<String, String>,
        selector: Option<&str>,
    ) -> GenerationResult {
        batch_with(inputs, templates, |input, template| {
            self.generate_unguarded(input, template, selector)
        })
    }
}

/// Runs `render`, turning a panic into its message.
fn isolate<F>(render: F) -> Result<String, String>
where
    F: FnOnce() -> String,
{
    panic::catch_unwind(AssertUnwindSafe(render)).map_err(|payload| panic_message(payload.as_ref()))
}

fn batch_with<F>(
    inputs: &IndexMap<String, String>,
    templates: &IndexMap<String, String>,
    render: F,
) -> GenerationResult
where
    F: Fn(&str, &str) -> String,
{
    let mut results = GenerationResult::with_capacity(inputs.len() * templates.len());

    for (input_name, input) in inputs {
        for (template_name, template) in templates {
            let output_name = generate_output_name(input_name, template_name);
            tracing::debug!(input = %input_name, template = %template_name, output = %output_name, "generating");

            let pair = isolate(|| render(input.as_str(), template.as_str())).map_err(|message| {
                CodegenError::PerPairGeneration {
                    input: input_name.clone(),
                    template: template_name.clone(),
                    message,
                }
            });
            match pair {
                Ok(text) => {
                    results.insert(output_name, text);
                }
                Err(err) => {
                    tracing::error!(error = %err, "batch entry failed");
                    results.insert(
                        error_entry_name(input_name, template_name),
                        format!("Error generating code: {}", err),
                    );
                }
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const GRAMMAR: &str = "grammar Entity\nname: ID;\nfield: STRING;";

    fn generator() -> CodeGenerator {
        let mut generator = CodeGenerator::new(TemplateCache::new());
        generator.load_grammar(GRAMMAR);
        generator
    }

    fn files(entries: &[(&str, &str)]) -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(name, text)| (name.to_string(), text.to_string()))
            .collect()
    }

    #[rstest]
    #[case("foo.dsl", "bar.ejs", "foo.bar.ejs")]
    #[case("foo", "bar", "foo.bar.txt")]
    #[case("model.v1.dsl", "entity.java.ejs", "model.v1.entity.java.ejs")]
    #[case(".env", "tpl.ts", "..tpl.ts")]
    #[case("input", ".hidden", "input..hidden")]
    fn test_generate_output_name(#[case] input: &str, #[case] template: &str, #[case] expected: &str) {
        assert_eq!(generate_output_name(input, template), expected);
    }

    #[test]
    fn test_error_entry_name() {
        assert_eq!(error_entry_name("a.dsl", "b.ejs"), "error_a.dsl_b.ejs.txt");
    }

    #[test]
    fn test_generate_single() {
        let output = generator().generate("name: Customer\n", "class <%= name %> {}", None);
        assert_eq!(output, "class Customer {}");
    }

    #[test]
    fn test_generate_without_grammar() {
        let generator = CodeGenerator::new(TemplateCache::new());
        assert_eq!(
            generator.generate("name: Customer", "<%= name %>", None),
            "Error: Failed to parse input - No grammar loaded"
        );
    }

    #[test]
    fn test_generate_applies_selector() {
        let output = generator().generate(
            "name: customer\nfield: id\n",
            "<%= name %>(<%= fields.join(', ') %>)",
            Some("ast.name = capitalize(ast.name); ast.fields = [ast.field, 'version'];"),
        );
        assert_eq!(output, "Customer(id, version)");
    }

    #[test]
    fn test_generate_reports_template_errors() {
        let output = generator().generate("name: x", "<% if { %>", None);
        assert!(output.starts_with("Error: Could not compile template - "));
    }

    #[test]
    fn test_batch_cross_product() {
        let generator = generator();
        let inputs = files(&[("a.dsl", "name: Alpha"), ("b.dsl", "name: Beta")]);
        let templates = files(&[("upper.txt", "<%= upper(name) %>"), ("plain", "<%= name %>")]);

        let results = generator.generate_batch(&inputs, &templates, None);
        let entries: Vec<(&str, &str)> = results
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("a.upper.txt", "ALPHA"),
                ("a.plain.txt", "Alpha"),
                ("b.upper.txt", "BETA"),
                ("b.plain.txt", "Beta"),
            ]
        );
        assert_eq!(generator.templates().cache().compilations(), 2);
    }

    #[test]
    fn test_batch_isolates_failing_template() {
        let generator = generator();
        let inputs = files(&[("a.dsl", "name: Alpha")]);
        let templates = files(&[("bad.ejs", "<%= 1 / 0 %>"), ("good.ejs", "<%= name %>")]);

        let results = generator.generate_batch(&inputs, &templates, None);
        assert_eq!(results.len(), 2);
        assert_eq!(
            results["a.bad.ejs"],
            "Error: Could not render template - division by zero"
        );
        assert_eq!(results["a.good.ejs"], "Alpha");
    }

    #[test]
    fn test_generate_rejects_oversized_range() {
        let output = generator().generate("name: a", "<%= range(100000000000000000000000) %>", None);
        assert!(output.starts_with("Error: Could not render template - range(): "));

        let output = generator().generate("name: a", "<%= len(range(3)) %>", None);
        assert_eq!(output, "3");
    }

    #[test]
    fn test_isolate_turns_panics_into_messages() {
        assert_eq!(isolate(|| "fine".to_string()), Ok("fine".to_string()));
        assert_eq!(isolate(|| panic!("renderer exploded")), Err("renderer exploded".to_string()));
    }

    #[test]
    fn test_batch_records_panicking_pair() {
        let inputs = files(&[("a.dsl", "name: Alpha")]);
        let templates = files(&[("good.txt", "ok"), ("bad.txt", "explode")]);

        let results = batch_with(&inputs, &templates, |input, template| {
            if template == "explode" {
                panic!("renderer exploded");
            }
            format!("{} / {}", input, template)
        });

        let names: Vec<&str> = results.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a.good.txt", "error_a.dsl_bad.txt.txt"]);
        assert_eq!(results["a.good.txt"], "name: Alpha / ok");
        assert_eq!(
            results["error_a.dsl_bad.txt.txt"],
            "Error generating code: renderer exploded (input a.dsl, template bad.txt)"
        );
    }

    #[test]
    fn test_batch_collisions_keep_last_pair() {
        let generator = generator();
        let inputs = files(&[("a.x", "name: First"), ("a.y", "name: Second")]);
        let templates = files(&[("t", "<%= name %>")]);

        let results = generator.generate_batch(&inputs, &templates, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results["a.t.txt"], "Second");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "unknown failure");
    }
}
