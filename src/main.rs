use anyhow::Result;
use dsl_codegen::cli;

fn main() -> Result<()> {
    cli::run()
}
