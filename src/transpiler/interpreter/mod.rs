
use crate::model::Model;
use crate::transpiler::errors::CodegenError;
use crate::transpiler::grammar::{Grammar, compile_grammar};

/// Builds a flat model from input text using the rules of a grammar.
///
/// For every rule, in declaration order, each line whose trimmed text starts
/// with the rule name contributes the trimmed text after its first colon.
/// Later matches overwrite earlier ones. Lines without a colon, or with
/// nothing after it, are skipped.
pub fn interpret(input: &str, grammar: &Grammar) -> Model {
    let mut model = Model::new(&grammar.name);

    for rule in &grammar.rules {
        for line in input.lines() {
            let line = line.trim();
            if !line.starts_with(rule.name.as_str()) {
                continue;
            }
            let Some((_, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            model.set_string(&rule.name, value);
        }
    }

    model
}

/// Keeps the last compiled grammar as its working grammar.
#[derive(Debug, Default, Clone)]
pub struct InputInterpreter {
    grammar: Option<Grammar>,
}

impl InputInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `source` and makes it the working grammar.
    pub fn load_grammar(&mut self, source: &str) -> &Grammar {
        self.grammar.insert(compile_grammar(source))
    }

    pub fn set_grammar(&mut self, grammar: Grammar) {
        self.grammar = Some(grammar);
    }

    pub fn grammar(&self) -> Option<&Grammar> {
        self.grammar.as_ref()
    }

    pub fn parse(&self, input: &str) -> Result<Model, CodegenError> {
        let grammar = self.grammar.as_ref().ok_or(CodegenError::NoGrammarLoaded)?;
        let model = interpret(input, grammar);
        tracing::debug!(
            grammar = %grammar.name,
            properties = model.properties.len(),
            "parsed input"
        );
        Ok(model)
    }
}
