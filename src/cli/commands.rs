use crate::cli::args::{Cli, Commands, SelectorArgs};
use crate::config::Config;
use crate::transpiler::{CodeGenerator, TemplateCache, compile_grammar, is_error_output};
use crate::workspace;
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        println!("dslgen v{}", env!("CARGO_PKG_VERSION"));
    }

    match cli.command {
        Commands::Grammar { input, json } => grammar_command(&input, json),
        Commands::Parse { input, grammar, json } => parse_command(&input, &grammar, json),
        Commands::Generate { input, grammar, template, selector, output } => {
            generate_command(&input, &grammar, &template, &selector, output.as_deref())
        }
        Commands::Batch { dsl_dir, input_dir, templates_dir, target_dir, selector_file, dry_run } => {
            let overrides = Config {
                dsl_dir,
                input_dir,
                templates_dir,
                target_dir,
                selector_file,
                ..Config::default()
            };
            let config = Config::from_env().with_overrides(overrides);
            batch_command(&config, dry_run, cli.verbose)
        }
    }
}

fn read_file(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {} file: {}", what, path.display()))
}

fn load_generator(grammar_path: &Path) -> Result<CodeGenerator> {
    let source = read_file(grammar_path, "grammar")?;
    let mut generator = CodeGenerator::new(TemplateCache::new());
    let grammar = generator.load_grammar(&source);
    if grammar.is_empty() {
        tracing::warn!(grammar = %grammar.name, "grammar has no rules; models will only carry $type");
    }
    Ok(generator)
}

fn read_selector(selector: &SelectorArgs) -> Result<Option<String>> {
    match (&selector.selector, &selector.selector_file) {
        (Some(inline), _) => Ok(Some(inline.clone())),
        (None, Some(path)) => read_file(path, "selector").map(Some),
        (None, None) => Ok(None),
    }
}

fn grammar_command(input: &Path, json: bool) -> Result<()> {
    let grammar = compile_grammar(&read_file(input, "grammar")?);

    if json {
        println!("{}", serde_json::to_string_pretty(&grammar)?);
    } else {
        println!("✅ Compiled grammar");
        println!("{}", grammar);
    }

    Ok(())
}

fn parse_command(input: &Path, grammar: &Path, json: bool) -> Result<()> {
    let generator = load_generator(grammar)?;
    let model = generator.parse_input(&read_file(input, "input")?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        println!("{}", model);
    }

    Ok(())
}

fn generate_command(
    input: &Path,
    grammar: &Path,
    template: &Path,
    selector: &SelectorArgs,
    output: Option<&Path>,
) -> Result<()> {
    let generator = load_generator(grammar)?;
    let input_text = read_file(input, "input")?;
    let template_text = read_file(template, "template")?;
    let selector = read_selector(selector)?;

    let generated = generator.generate(&input_text, &template_text, selector.as_deref());
    if is_error_output(&generated) {
        return Err(anyhow!("{}", generated));
    }

    match output {
        Some(path) => {
            fs::write(path, &generated)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            println!("✅ Generated {}", path.display());
        }
        None => print!("{}", generated),
    }

    Ok(())
}

fn required_dir<'c>(dir: &'c Option<PathBuf>) -> Result<&'c Path> {
    dir.as_deref()
        .ok_or_else(|| anyhow!("Please select all required directories"))
}

fn batch_command(config: &Config, dry_run: bool, verbose: bool) -> Result<()> {
    let dsl_dir = required_dir(&config.dsl_dir)?;
    let input_dir = required_dir(&config.input_dir)?;
    let templates_dir = required_dir(&config.templates_dir)?;
    let target_dir = required_dir(&config.target_dir)?;

    let grammar_path = workspace::find_grammar_file(dsl_dir, &config.grammar_extensions)?
        .ok_or_else(|| {
            anyhow!(
                "No grammar file ({}) found in {}",
                config.grammar_extensions.join(", "),
                dsl_dir.display()
            )
        })?;

    let inputs = workspace::read_text_files(input_dir)?;
    if inputs.is_empty() {
        return Err(anyhow!("No input files found"));
    }
    let templates = workspace::read_text_files(templates_dir)?;
    if templates.is_empty() {
        return Err(anyhow!("No template files found"));
    }

    let selector = match &config.selector_file {
        Some(path) => Some(read_file(path, "selector")?),
        None => None,
    };

    tracing::info!(inputs = inputs.len(), templates = templates.len(), "batch generation started");
    if verbose {
        println!(
            "Found {} input files and {} templates",
            inputs.len(),
            templates.len()
        );
    }

    let generator = load_generator(&grammar_path)?;
    let results = generator.generate_batch(&inputs, &templates, selector.as_deref());
    let failures = results
        .iter()
        .filter(|(name, text)| is_error_output(text) || name.starts_with("error_"))
        .count();

    if dry_run {
        for name in results.keys() {
            println!("{}", target_dir.join(name).display());
        }
    } else {
        let written = workspace::write_outputs(target_dir, &results)?;
        println!("✅ Wrote {} files to {}", written.len(), target_dir.display());
    }

    if failures > 0 {
        println!("⚠️  {} of {} outputs contain errors", failures, results.len());
    }

    Ok(())
}
