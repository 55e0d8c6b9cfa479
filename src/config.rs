use std::env;
use std::path::PathBuf;

pub const DSL_DIR_VAR: &str = "CODEGEN_DSL_DIR";
pub const INPUT_DIR_VAR: &str = "CODEGEN_INPUT_DIR";
pub const TEMPLATES_DIR_VAR: &str = "CODEGEN_TEMPLATES_DIR";
pub const TARGET_DIR_VAR: &str = "CODEGEN_TARGET_DIR";
pub const SELECTOR_FILE_VAR: &str = "CODEGEN_SELECTOR_FILE";
pub const GRAMMAR_EXTENSIONS_VAR: &str = "CODEGEN_GRAMMAR_EXTENSIONS";

pub const DEFAULT_GRAMMAR_EXTENSIONS: [&str; 2] = ["langium", "grammar"];

/// Locations of the four working directories and related settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub dsl_dir: Option<PathBuf>,
    pub input_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
    pub target_dir: Option<PathBuf>,
    pub selector_file: Option<PathBuf>,
    pub grammar_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dsl_dir: None,
            input_dir: None,
            templates_dir: None,
            target_dir: None,
            selector_file: None,
            grammar_extensions: DEFAULT_GRAMMAR_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str| value(key).map(PathBuf::from);

        let mut config = Self {
            dsl_dir: path(DSL_DIR_VAR),
            input_dir: path(INPUT_DIR_VAR),
            templates_dir: path(TEMPLATES_DIR_VAR),
            target_dir: path(TARGET_DIR_VAR),
            selector_file: path(SELECTOR_FILE_VAR),
            ..Self::default()
        };

        if let Some(extensions) = value(GRAMMAR_EXTENSIONS_VAR) {
            let parsed: Vec<String> = extensions
                .split(',')
                .map(|e| e.trim().trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect();
            if !parsed.is_empty() {
                config.grammar_extensions = parsed;
            }
        }

        config
    }

    /// Replaces settings with the ones given explicitly (e.g. CLI flags).
    pub fn with_overrides(mut self, overrides: Config) -> Self {
        self.dsl_dir = overrides.dsl_dir.or(self.dsl_dir);
        self.input_dir = overrides.input_dir.or(self.input_dir);
        self.templates_dir = overrides.templates_dir.or(self.templates_dir);
        self.target_dir = overrides.target_dir.or(self.target_dir);
        self.selector_file = overrides.selector_file.or(self.selector_file);
        self
    }
}
