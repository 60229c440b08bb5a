use anyhow::Result;
use clap::Parser;
use gleaner_agent::ScrapeStatus;
use gleaner_common::observability::{LogConfig, init_logging};
use gleaner_config::GleanerSettingsLoader;
use std::path::PathBuf;
use std::process::ExitCode;

mod run;

/// Extract structured data from a web page with a language model.
#[derive(Debug, Parser)]
#[command(name = "gleaner", version, about)]
struct Cli {
    /// Job description (JSON: url, schema, interactions, options).
    #[arg(long)]
    job: PathBuf,

    /// Where to write the result envelope.
    #[arg(long, default_value = "scraping_result.json")]
    output: PathBuf,

    /// Settings file. Without it, ./gleaner.yaml is used when present.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// OpenAI API key; overrides llm.auth_token.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Debug-level logs, mirrored to stderr.
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loader = match &cli.settings {
        Some(path) => GleanerSettingsLoader::new().with_file(path),
        None => GleanerSettingsLoader::new().with_optional_file("gleaner.yaml"),
    };
    let mut settings = loader.load()?;
    run::override_api_key(&mut settings.llm, cli.api_key.clone());

    let log_path = init_logging(LogConfig {
        app_name: "gleaner",
        log_dir: settings.logging.dir.as_ref().map(PathBuf::from),
        emit_stderr: settings.logging.stderr || cli.verbose,
        format: settings.logging.format,
        default_filter: if cli.verbose {
            "debug".to_string()
        } else {
            settings.logging.filter.clone()
        },
    })?;
    tracing::info!(log = %log_path.display(), job = %cli.job.display(), "gleaner.start");

    let job = run::read_job(&cli.job)?;
    let result = run::run_job(&settings, &job).await?;
    run::write_result(&cli.output, &result)?;

    let report = &result.quality_report;
    eprintln!(
        "{}: {} items, {:.1}% complete -> {}",
        result.status.as_str(),
        report.total_items,
        report.completion_rate * 100.0,
        cli.output.display()
    );
    if let Some(msg) = &result.error_message {
        eprintln!("error: {msg}");
    }
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }

    Ok(if result.status == ScrapeStatus::Error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
