//! Pipeline: parse -> select -> normalize -> validate -> serialize
//!
//! Every stage except selection is synchronous and deterministic. The first
//! error stops the run; nothing is normalized from a failed or cancelled
//! selection.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::compression;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::normalize::{normalize, validate, NormalizeOutcome};
use crate::oracle::{select_candidates, SelectionOracle};
use crate::table::{read_segments, write_table};
use crate::time::Timestamp;
use crate::transcript::parse_transcript;
use crate::types::{CompressionReport, NormalizeConfig, SegmentCandidate, Transcript};

/// Per-run inputs that are not engine configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Length of the recording; defaults to the transcript's end.
    pub source_duration: Option<Timestamp>,
    /// Overrides the configured oracle timeout.
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub transcript: Transcript,
    pub outcome: NormalizeOutcome,
    pub report: CompressionReport,
    /// Serialized segment table
    pub table: String,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: EngineConfig,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn run(
        &self,
        transcript_text: &str,
        oracle: &dyn SelectionOracle,
        options: &RunOptions,
    ) -> Result<PipelineOutput> {
        let transcript = parse_transcript(transcript_text)?;
        info!(
            units = transcript.len(),
            duration = %transcript.duration(),
            "transcript parsed"
        );

        let timeout = options.timeout.or_else(|| self.config.oracle_timeout());
        let candidates =
            select_candidates(oracle, &transcript, timeout, &options.cancel).await?;

        let source = options.source_duration.unwrap_or(transcript.duration());
        self.finish(transcript, &candidates, source)
    }

    /// Re-normalize an existing segment table, e.g. one edited by hand.
    /// `bounds` clamps segments to a known transcript end.
    pub fn renormalize(
        &self,
        table_text: &str,
        bounds: Option<Timestamp>,
    ) -> Result<(NormalizeOutcome, String)> {
        let candidates: Vec<SegmentCandidate> = read_segments(table_text)?
            .iter()
            .map(|segment| segment.to_candidate())
            .collect();
        let outcome = normalize(&candidates, self.config.normalize_config(), bounds)?;
        let table = write_table(&outcome.segments, &self.config.file_extension);
        Ok((outcome, table))
    }

    /// Compression report for an existing segment table.
    ///
    /// The table must already be normalized: rows in order, non-empty and not
    /// touching. Gap and duration settings are not rechecked, so a table
    /// written with a different `min_gap` is still measured.
    pub fn report(&self, table_text: &str, source: Timestamp) -> Result<CompressionReport> {
        let segments = read_segments(table_text)?;
        // Overlapping rows would be counted twice.
        validate(&segments, NormalizeConfig::new(Duration::ZERO, Duration::ZERO), None)?;
        Ok(compression::evaluate(
            source.into(),
            &segments,
            self.config.target_compression_ratio,
        ))
    }

    fn finish(
        &self,
        transcript: Transcript,
        candidates: &[SegmentCandidate],
        source: Timestamp,
    ) -> Result<PipelineOutput> {
        let bounds = Some(source.max(transcript.duration()));
        let outcome = normalize(candidates, self.config.normalize_config(), bounds)?;
        let report = compression::evaluate(
            source.into(),
            &outcome.segments,
            self.config.target_compression_ratio,
        );
        let table = write_table(&outcome.segments, &self.config.file_extension);
        Ok(PipelineOutput {
            transcript,
            outcome,
            report,
            table,
        })
    }
}
