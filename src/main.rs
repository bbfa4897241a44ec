use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use oapi_go_gen::config::{load_config, merge_with_cli_args, CliOverrides};
use oapi_go_gen::pipeline::{generate_with, load_document};
use oapi_go_gen::{Error, GenerationOutput, GeneratorRegistry};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the OpenAPI or Swagger document (YAML or JSON)
    #[arg(short, long)]
    spec: Option<PathBuf>,

    /// Output directory for generated code
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to config file (overrides default location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Go package name of the generated code
    #[arg(short, long)]
    package: Option<String>,

    /// Fail when any warning-level issue is recorded
    #[arg(long)]
    strict: bool,

    /// Log every resolved schema and bound operation
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether the pass succeeded.
fn run(args: Args) -> Result<bool> {
    let config = load_config(args.config.as_deref())?;
    let config = merge_with_cli_args(
        config,
        CliOverrides {
            spec: args.spec,
            output: args.output,
            package: args.package,
            strict: args.strict,
        },
    );
    config.validate()?;

    let input = config
        .input
        .as_ref()
        .context("No input source specified. Use --spec or configure input in config file")?;
    if let Some(source) = &input.source {
        tracing::info!(source = %source.display(), "reading input");
    }
    let document = load_document(input).context("Failed to parse input document")?;

    let registry = GeneratorRegistry::new();
    let generator = registry
        .get("golang")
        .context("the Go generator is not registered")?;

    let output_dir = config
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("generated"));

    match generate_with(generator, &document, &config.generation) {
        Ok(output) => {
            write_artifacts(&output, &output_dir, generator.file_extension())?;
            report(&output);
            Ok(output.is_success())
        }
        Err(Error::Strict(output)) => {
            write_artifacts(&output, &output_dir, generator.file_extension())?;
            report(&output);
            eprintln!(
                "strict mode: {} issue(s) at warning level or above",
                output.blocking_issue_count()
            );
            Ok(false)
        }
        Err(err) => Err(err).context("generation failed"),
    }
}

fn write_artifacts(output: &GenerationOutput, dir: &Path, extension: &str) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    for artifact in &output.artifacts {
        let path = dir.join(artifact.file_name(extension));
        fs::write(&path, &artifact.content)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;
        tracing::info!(path = %path.display(), "generated");
    }
    Ok(())
}

fn report(output: &GenerationOutput) {
    for issue in &output.issues {
        eprintln!("{issue}");
    }
    tracing::info!(
        artifacts = output.artifacts.len(),
        issues = output.issues.len(),
        "done"
    );
}
