//! Run command implementation.

use crate::cli::RunArgs;
use crate::config::{Config, SourceKind};
use crate::error::{CliError, Result};
use crate::logging;
use crate::output::{Formatter, TerminalObserver};
use std::fs;
use std::path::Path;
use tracing::info;
use triplex_domain::RecordSource;
use triplex_extractor::{Pipeline, RunMode, RunOptions, RunStats, TracingObserver};
use triplex_llm::ModelGateway;
use triplex_source::{FileSource, SqliteSource};
use triplex_store::Materializer;

/// Execute the run command and return the process exit code.
pub async fn execute_run(args: RunArgs, formatter: &Formatter) -> Result<i32> {
    let _log_guard = logging::init(&args.log_file, args.verbose)?;

    let config = Config::load(&args.config)?;
    let system_prompt = load_prompt(&args.prompt)?;
    let options = run_options(&args);
    options.validate().map_err(CliError::InvalidInput)?;

    let kind = args.source.map(SourceKind::from).unwrap_or(config.source.kind);
    let gateway = ModelGateway::http(
        config.gateway_config(&system_prompt)?,
        config.extraction_settings(args.granularity),
    )?;
    let materializer = Materializer::new(config.materializer_config(args.no_visualization))
        .map_err(|e| CliError::Config(e.to_string()))?;

    info!(
        config = %args.config.display(),
        source = ?kind,
        model = %gateway.model(),
        provider = %gateway.provider(),
        granularity = gateway.granularity().get(),
        "Starting run"
    );
    println!("{}", formatter.header("TRIPLE EXTRACTION"));
    println!(
        "{}",
        formatter.info(&format!(
            "Model: {} ({}), granularity {}/5",
            gateway.model(),
            gateway.provider(),
            gateway.granularity()
        ))
    );

    let output_dir = &config.processing.output_dir;
    let stats = match kind {
        SourceKind::File => {
            let source = FileSource::new(
                &config.source.input_dir,
                &config.source.extensions,
                config.source.recursive,
            )?;
            run_pipeline(source, gateway, materializer, output_dir, &options, formatter).await?
        }
        SourceKind::Database => {
            let (database_path, query) = config.database_settings().map_err(CliError::Config)?;
            let source = SqliteSource::new(database_path, query)?;
            run_pipeline(source, gateway, materializer, output_dir, &options, formatter).await?
        }
    };

    Ok(stats.exit_code())
}

async fn run_pipeline<S: RecordSource>(
    source: S,
    gateway: ModelGateway,
    materializer: Materializer,
    output_dir: &Path,
    options: &RunOptions,
    formatter: &Formatter,
) -> Result<RunStats> {
    let mut pipeline = Pipeline::new(source, gateway, materializer, output_dir)
        .with_observer(TracingObserver)
        .with_observer(TerminalObserver::new(*formatter));
    Ok(pipeline.run(options).await?)
}

/// Read the system prompt; a missing or blank file is a configuration error.
pub fn load_prompt(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(CliError::Config(format!(
            "prompt file not found: {}",
            path.display()
        )));
    }
    let prompt = fs::read_to_string(path)?;
    if prompt.trim().is_empty() {
        return Err(CliError::Config(format!("prompt file is empty: {}", path.display())));
    }
    Ok(prompt)
}

/// Translate command line flags into run options.
pub fn run_options(args: &RunArgs) -> RunOptions {
    let mode = if args.update_metadata {
        RunMode::RefreshMetadata
    } else {
        RunMode::Extract {
            skip_existing: args.skip_existing,
        }
    };

    RunOptions {
        mode,
        limit: args.limit,
        selector: args.file.clone(),
    }
}
