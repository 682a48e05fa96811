use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use talkcut::cli::{CleanArgs, Cli, Command, NormalizeArgs, ReportArgs, SelectArgs};
use talkcut::oracle::{CommandOracle, SelectionOracle, TableOracle};
use talkcut::pipeline::{Pipeline, RunOptions};
use talkcut::transcript::parse_transcript;
use talkcut::types::CompressionReport;
use talkcut::workdir::{reset_dir, DEFAULT_ARTIFACT_EXTENSIONS};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("talkcut=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Select(args) => handle_select(&args).await,
        Command::Normalize(args) => handle_normalize(&args),
        Command::Report(args) => handle_report(&args),
        Command::Clean(args) => handle_clean(&args),
    }
}

async fn handle_select(args: &SelectArgs) -> Result<()> {
    args.validate()
        .context("Failed to validate command-line arguments")?;
    let config = args.engine.resolve()?;
    let pipeline = Pipeline::new(config);

    let transcript_text = read_text(&args.transcript)?;
    let oracle: Box<dyn SelectionOracle> = match (&args.from_table, &args.command) {
        (Some(table), _) => Box::new(TableOracle::new(table)),
        (None, Some(program)) => {
            let mut oracle = CommandOracle::new(program).with_args(args.command_args.clone());
            if let Some(dir) = args.transcript.parent().filter(|d| !d.as_os_str().is_empty()) {
                oracle = oracle.with_working_dir(dir);
            }
            Box::new(oracle)
        }
        (None, None) => bail!("Provide an oracle via --from-table or --command"),
    };

    let cancel = CancellationToken::new();
    let options = RunOptions {
        source_duration: args.source_duration()?,
        timeout: None,
        cancel: cancel.clone(),
    };

    let output = tokio::select! {
        output = pipeline.run(&transcript_text, oracle.as_ref(), &options) => output,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received; cancelling selection");
            cancel.cancel();
            bail!("Selection interrupted");
        }
    }
    .context("Segment selection failed")?;

    eprintln!(
        "Normalized: {} -> {} segments ({} merged, {} dropped{})",
        output.outcome.candidates,
        output.outcome.segments.len(),
        output.outcome.merged,
        output.outcome.dropped,
        if output.outcome.clamped { ", clamped to transcript" } else { "" }
    );
    emit_table(&output.table, args.output.as_deref())?;
    finish_report(&output.report, args.strict)
}

fn handle_normalize(args: &NormalizeArgs) -> Result<()> {
    let pipeline = Pipeline::new(args.engine.resolve()?);
    let table_text = read_text(&args.table)?;
    let bounds = match &args.transcript {
        Some(path) => {
            let transcript = parse_transcript(&read_text(path)?)
                .with_context(|| format!("Failed to parse transcript {:?}", path))?;
            Some(transcript.duration())
        }
        None => None,
    };

    let (outcome, table) = pipeline
        .renormalize(&table_text, bounds)
        .with_context(|| format!("Failed to normalize {:?}", args.table))?;
    eprintln!(
        "Normalized: {} -> {} segments ({} merged)",
        outcome.candidates,
        outcome.segments.len(),
        outcome.merged
    );
    emit_table(&table, args.output.as_deref())
}

fn handle_report(args: &ReportArgs) -> Result<()> {
    let pipeline = Pipeline::new(args.engine.resolve()?);
    let source = match (&args.transcript, args.source_duration()?) {
        (_, Some(duration)) => duration,
        (Some(path), None) => parse_transcript(&read_text(path)?)
            .with_context(|| format!("Failed to parse transcript {:?}", path))?
            .duration(),
        (None, None) => bail!("Provide --transcript or --source-duration"),
    };

    let report = pipeline
        .report(&read_text(&args.table)?, source)
        .with_context(|| format!("Failed to measure segment table {:?}", args.table))?;
    finish_report(&report, args.strict)
}

fn handle_clean(args: &CleanArgs) -> Result<()> {
    let removed = if args.extensions.is_empty() {
        reset_dir(&args.dir, &DEFAULT_ARTIFACT_EXTENSIONS[..])?
    } else {
        reset_dir(&args.dir, &args.extensions[..])?
    };
    if removed.is_empty() {
        println!("No files to clean up");
    } else {
        println!("Removed: {}", removed.join(", "));
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

fn emit_table(table: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, table)
                .with_context(|| format!("Failed to write segment table {:?}", path))?;
            eprintln!("Segment table written to {:?}", path);
        }
        None => print!("{}", table),
    }
    Ok(())
}

fn finish_report(report: &CompressionReport, strict: bool) -> Result<()> {
    eprintln!(
        "Retained {:.1}s of {:.1}s in {} segments: ratio {:.3} (target {:.3}) {}",
        report.total_retained_duration.as_secs_f64(),
        report.total_source_duration.as_secs_f64(),
        report.segment_count,
        report.ratio,
        report.target_ratio,
        if report.passed { "ok" } else { "MISSED" }
    );
    if !report.passed {
        eprintln!(
            "   {:.1}s more must be cut to meet the target",
            report.excess.as_secs_f64()
        );
        if strict {
            bail!(
                "Compression target missed: ratio {:.3} exceeds {:.3}",
                report.ratio,
                report.target_ratio
            );
        }
    }
    Ok(())
}
