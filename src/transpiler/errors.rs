use thiserror::Error;

/// Failures of the template/selector language.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("syntax error at line {line}, column {column}: expected {expected}")]
    Syntax {
        line: usize,
        column: usize,
        expected: String,
    },

    #[error("unterminated tag starting at byte {0}")]
    UnterminatedTag(usize),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("expression of type {0} is not callable")]
    NotCallable(&'static str),

    #[error("{name}() expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("{name}(): {message}")]
    BadArgument { name: String, message: String },

    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("cannot apply '{op}' to {operand}")]
    InvalidOperand {
        op: &'static str,
        operand: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot iterate over {0}")]
    NotIterable(&'static str),

    #[error("cannot assign {target}: {reason}")]
    InvalidAssignment { target: String, reason: String },

    #[error("expression nesting exceeds {0} levels")]
    NestingTooDeep(usize),

    #[error("script contains more than {0} operators")]
    TooManyOperators(usize),

    #[error("literal chunk {0} is not defined")]
    UnknownChunk(usize),
}

/// Failures of the generation pipeline. None of these escape the public
/// `generate`/`generate_batch`/`render`/`transform` entry points; they are
/// turned into inline error text or a fallback there.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("No grammar loaded")]
    NoGrammarLoaded,

    #[error("Could not compile template - {0}")]
    TemplateCompile(ScriptError),

    #[error("Could not render template - {0}")]
    TemplateRender(ScriptError),

    #[error("Selector evaluation failed - {0}")]
    SelectorEvaluation(ScriptError),

    #[error("Selector evaluation failed - `ast` must remain an object, got {0}")]
    SelectorResultNotObject(&'static str),

    #[error("{message} (input {input}, template {template})")]
    PerPairGeneration {
        input: String,
        template: String,
        message: String,
    },
}

/// Prefix carried by every textual error result.
pub const ERROR_PREFIX: &str = "Error:";

/// True when a generated text is an inline error rather than output.
pub fn is_error_output(text: &str) -> bool {
    text.starts_with(ERROR_PREFIX)
}
