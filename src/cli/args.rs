use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dslgen",
    about = "Generate source files from DSL inputs using a grammar and EJS-style templates",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Selector given inline or read from a file.
#[derive(Args, Debug, Default)]
pub struct SelectorArgs {
    /// Selector statements run against `ast` before rendering
    #[arg(long, conflicts_with = "selector_file")]
    pub selector: Option<String>,

    /// File containing the selector statements
    #[arg(long, value_name = "FILE")]
    pub selector_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a grammar file and list its rules
    Grammar {
        /// Grammar file (.langium, .grammar, ...)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print the grammar as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interpret an input file against a grammar and print the model
    Parse {
        /// Input file to interpret
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Grammar file
        #[arg(short, long)]
        grammar: PathBuf,

        /// Print the model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render one input through one template
    Generate {
        /// Input file to interpret
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Grammar file
        #[arg(short, long)]
        grammar: PathBuf,

        /// Template file
        #[arg(short, long)]
        template: PathBuf,

        #[command(flatten)]
        selector: SelectorArgs,

        /// Write the result to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render every input through every template
    Batch {
        /// Directory holding the grammar file
        #[arg(long)]
        dsl_dir: Option<PathBuf>,

        /// Directory holding the input files
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Directory holding the templates
        #[arg(long)]
        templates_dir: Option<PathBuf>,

        /// Directory receiving the generated files
        #[arg(long)]
        target_dir: Option<PathBuf>,

        /// File containing the selector statements
        #[arg(long, value_name = "FILE")]
        selector_file: Option<PathBuf>,

        /// List the files that would be written without writing them
        #[arg(long)]
        dry_run: bool,
    },
}
