use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::config::{ConfigOverrides, EngineConfig};
use crate::time::{parse_time, Timestamp};

#[derive(Parser, Debug)]
#[command(
    name = "talkcut",
    version,
    about = "Turn a subtitle transcript into an ordered table of segments worth keeping"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask an oracle for valuable spans and write the normalized segment table.
    Select(SelectArgs),
    /// Re-normalize an existing segment table (merge close rows, renumber files).
    Normalize(NormalizeArgs),
    /// Print the compression report of an existing segment table.
    Report(ReportArgs),
    /// Remove artifacts of a previous run from a directory.
    Clean(CleanArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// JSON file with engine settings.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Minimum separation between segments, in seconds.
    #[arg(long = "min-gap", value_name = "SECONDS")]
    pub min_gap: Option<f64>,
    /// Segments shorter than this are dropped, in seconds.
    #[arg(long = "min-duration", value_name = "SECONDS")]
    pub min_duration: Option<f64>,
    /// Maximum retained/source ratio.
    #[arg(long = "target-ratio", value_name = "RATIO")]
    pub target_ratio: Option<f64>,
    /// Extension used in the `file` column.
    #[arg(long = "ext", value_name = "EXT")]
    pub extension: Option<String>,
    /// Give up on the oracle after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,
}

impl EngineArgs {
    pub fn resolve(&self) -> Result<EngineConfig> {
        let overrides = ConfigOverrides {
            target_compression_ratio: self.target_ratio,
            min_gap_seconds: self.min_gap,
            min_segment_duration_seconds: self.min_duration,
            file_extension: self.extension.clone(),
            oracle_timeout_seconds: self.timeout,
        };
        EngineConfig::resolve(self.config.as_deref(), &overrides)
            .context("Failed to resolve engine configuration")
    }
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("oracle").required(true).args(["from_table", "command"])))]
pub struct SelectArgs {
    /// Subtitle transcript (SRT or WebVTT).
    #[arg(value_name = "TRANSCRIPT")]
    pub transcript: PathBuf,
    /// Take candidates from a curated segment table.
    #[arg(long = "from-table", value_name = "PATH")]
    pub from_table: Option<PathBuf>,
    /// External program that reads SRT on stdin and prints a segment table.
    #[arg(long, value_name = "PROGRAM")]
    pub command: Option<String>,
    /// Argument passed to the external program (repeatable).
    #[arg(long = "arg", value_name = "ARG", requires = "command", allow_hyphen_values = true)]
    pub command_args: Vec<String>,
    /// Where to write the table; stdout when omitted.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// Length of the recording (seconds or HH:MM:SS); defaults to the transcript end.
    #[arg(long = "source-duration", value_name = "TIME")]
    pub source_duration: Option<String>,
    /// Exit with an error when the compression target is missed.
    #[arg(long)]
    pub strict: bool,
    #[command(flatten)]
    pub engine: EngineArgs,
}

impl SelectArgs {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.transcript.is_file(),
            "Transcript file does not exist: {:?}",
            self.transcript
        );
        if let Some(output) = &self.output {
            ensure!(!output.is_dir(), "Output path is a directory: {:?}", output);
        }
        Ok(())
    }

    pub fn source_duration(&self) -> Result<Option<Timestamp>> {
        parse_optional_time(self.source_duration.as_deref(), "source duration")
    }
}

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// Segment table to normalize.
    #[arg(value_name = "TABLE")]
    pub table: PathBuf,
    /// Transcript whose end bounds the segments.
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,
    /// Where to write the table; stdout when omitted. May equal TABLE.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("source").required(true).args(["transcript", "source_duration"])))]
pub struct ReportArgs {
    /// Normalized segment table to measure; run `normalize` on hand-edited tables first.
    #[arg(value_name = "TABLE")]
    pub table: PathBuf,
    /// Transcript whose end is the source duration.
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,
    /// Length of the recording (seconds or HH:MM:SS).
    #[arg(long = "source-duration", value_name = "TIME")]
    pub source_duration: Option<String>,
    /// Exit with an error when the compression target is missed.
    #[arg(long)]
    pub strict: bool,
    #[command(flatten)]
    pub engine: EngineArgs,
}

impl ReportArgs {
    pub fn source_duration(&self) -> Result<Option<Timestamp>> {
        parse_optional_time(self.source_duration.as_deref(), "source duration")
    }
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    /// Directory to clean.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
    /// Extension to remove (repeatable); defaults to mp4, csv, srt and vtt.
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,
}

fn parse_optional_time(value: Option<&str>, label: &str) -> Result<Option<Timestamp>> {
    match value {
        Some(raw) => {
            let time =
                parse_time(raw).with_context(|| format!("Invalid {} '{}'", label, raw))?;
            Ok(Some(time))
        }
        None => Ok(None),
    }
}
