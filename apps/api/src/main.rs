mod config;
mod errors;
mod extraction;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::errors::AppError;
use crate::extraction::confidence::{breakdown, breakdown_value, ConfidenceBreakdown};
use crate::extraction::parser::SkillListMode;
use crate::extraction::pipeline::{
    PdfTextExtractor, PlainTextExtractor, ResumePipeline, TextExtractor, VerbatimModel,
};

/// What the input file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputKind {
    /// A resume PDF; runs extraction, the model step, parsing and scoring.
    Pdf,
    /// A model answer in the positional line convention.
    Text,
    /// A JSON request body: {"file": "<base64 PDF>"} or {"raw_text": "..."}.
    Request,
    /// An already extracted JSON record to score as-is.
    Record,
}

#[derive(Debug, Parser)]
#[command(
    name = "resume-api",
    version,
    about = "Extract candidate fields from a resume and score the extraction"
)]
struct Cli {
    /// Input file, or `-` for stdin
    input: PathBuf,

    #[arg(long, value_enum, default_value_t = InputKind::Text)]
    kind: InputKind,

    /// Strip brackets and empty tokens from skill lists (overrides SKILL_LIST_MODE)
    #[arg(long)]
    strict_skills: bool,

    /// Include per-field contributions in the output
    #[arg(long)]
    breakdown: bool,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Config failures are reported with the same error body as run failures.
    let config = Config::from_env();
    let rust_log = config
        .as_ref()
        .map(|c| c.rust_log.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Structured logging on stderr; stdout carries the JSON result.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting resume-api v{}", env!("CARGO_PKG_VERSION"));

    let result = match config {
        Ok(config) => execute(&cli, &config).await,
        Err(e) => Err(e),
    };

    let (output, exit_code) = match result {
        Ok(output) => (output, ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("{e}");
            (e.to_body(), ExitCode::FAILURE)
        }
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");

    Ok(exit_code)
}

async fn execute(cli: &Cli, config: &Config) -> Result<Value, AppError> {
    let pipeline = build_pipeline(cli, config)?;
    run(cli, &pipeline).await
}

fn build_pipeline(cli: &Cli, config: &Config) -> Result<ResumePipeline, AppError> {
    let skill_mode = if cli.strict_skills {
        SkillListMode::Strict
    } else {
        config.skill_list_mode
    };
    let policy = config.scoring_policy()?;
    let extractor: Arc<dyn TextExtractor> = match cli.kind {
        InputKind::Pdf | InputKind::Request => Arc::new(PdfTextExtractor),
        InputKind::Text | InputKind::Record => Arc::new(PlainTextExtractor),
    };
    info!(
        "Pipeline ready: kind={:?}, parser={:?}, skill_mode={:?}",
        cli.kind, config.output_parser, skill_mode
    );

    Ok(ResumePipeline::new(
        extractor,
        Arc::new(VerbatimModel),
        config.output_parser.build(skill_mode),
        policy,
    ))
}

async fn run(cli: &Cli, pipeline: &ResumePipeline) -> Result<Value, AppError> {
    let content = read_input(&cli.input).await?;

    match cli.kind {
        InputKind::Pdf | InputKind::Text => {
            let scored = pipeline.process(content).await?;
            let parts = breakdown(&scored.extraction, pipeline.policy());
            let output = to_json(&scored)?;
            attach_breakdown(output, cli.breakdown.then_some(parts))
        }
        InputKind::Request => {
            let payload = parse_json(&content)?;
            let scored = pipeline.process_request(&payload).await?;
            let parts = breakdown(&scored.extraction, pipeline.policy());
            let output = to_json(&scored)?;
            attach_breakdown(output, cli.breakdown.then_some(parts))
        }
        InputKind::Record => {
            let record = parse_json(&content)?;
            let parts = breakdown_value(&record, pipeline.policy());
            let output = pipeline.score_record(record)?;
            attach_breakdown(output, cli.breakdown.then_some(parts))
        }
    }
}

async fn read_input(path: &Path) -> Result<Vec<u8>, AppError> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .map_err(|e| AppError::InvalidInput(format!("Cannot read stdin: {e}")))?;
        return Ok(buf);
    }

    tokio::fs::read(path)
        .await
        .map_err(|e| AppError::InvalidInput(format!("Cannot read '{}': {e}", path.display())))
}

fn parse_json(content: &[u8]) -> Result<Value, AppError> {
    serde_json::from_slice(content)
        .map_err(|e| AppError::InvalidInput(format!("Input is not valid JSON: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

fn attach_breakdown(
    mut output: Value,
    parts: Option<ConfidenceBreakdown>,
) -> Result<Value, AppError> {
    if let (Some(parts), Some(fields)) = (parts, output.as_object_mut()) {
        fields.insert("breakdown".to_string(), to_json(&parts)?);
    }
    Ok(output)
}
