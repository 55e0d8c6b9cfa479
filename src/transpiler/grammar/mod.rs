pub mod tests;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

pub const UNNAMED_GRAMMAR: &str = "UnnamedGrammar";

static GRAMMAR_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"grammar\s+([A-Za-z0-9_]+)").expect("valid grammar name pattern"));

// identifier, optional whitespace, colon, a body without semicolons, semicolon
static RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9_]+)\s*:\s*([^;]+);").expect("valid rule pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuleKind {
    Rule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub name: String,
    pub kind: RuleKind,
    /// Raw rule body. Kept for display only; nothing parses it further.
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grammar {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl Grammar {
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "grammar {} ({} rules)", self.name, self.rules.len())?;
        for rule in &self.rules {
            write!(f, "\n  {:?} {}: {}", rule.kind, rule.name, rule.definition.trim())?;
        }
        Ok(())
    }
}

/// Compiles grammar source with a lexical scan.
///
/// The scan does not understand nesting, comments or string literals that
/// contain semicolons; anything not matching the rule pattern is skipped.
/// Compilation cannot fail: a source without rules yields an empty grammar.
pub fn compile_grammar(source: &str) -> Grammar {
    let name = GRAMMAR_NAME
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNNAMED_GRAMMAR.to_string());

    let rules = RULE
        .captures_iter(source)
        .map(|caps| Rule {
            name: caps[1].to_string(),
            kind: RuleKind::Rule,
            definition: caps[2].to_string(),
        })
        .collect::<Vec<_>>();

    tracing::debug!(grammar = %name, rules = rules.len(), "compiled grammar");

    Grammar { name, rules }
}
