mod accumulator;
mod validate;

use tracing::{info, warn};

use crate::error::Result;
use crate::time::Timestamp;
use crate::types::{NormalizeConfig, NormalizedSegment, SegmentCandidate};

use accumulator::SegmentAccumulator;
use validate::clamp_candidates;

pub use validate::validate;

/// Normalized segments plus what happened to the candidates on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOutcome {
    pub segments: Vec<NormalizedSegment>,
    /// Number of candidates handed in
    pub candidates: usize,
    /// Candidates or merged spans rejected as too short
    pub dropped: usize,
    /// Candidates fused into an earlier segment
    pub merged: usize,
    /// Whether candidates had to be pulled back inside the transcript
    pub clamped: bool,
}

/// Pure function turning oracle candidates into ordered, gap-respecting
/// segments.
///
/// `bounds` is the transcript duration. When the first pass produces a span
/// past it, candidates are clamped to `[0, bounds]` and normalized again; a
/// violation after that is returned as an error.
pub fn normalize(
    candidates: &[SegmentCandidate],
    config: NormalizeConfig,
    bounds: Option<Timestamp>,
) -> Result<NormalizeOutcome> {
    let first = run_pass(candidates, config);
    let outcome = match (validate(&first.segments, config, bounds), bounds) {
        (Ok(()), _) => first,
        (Err(err), Some(limit)) => {
            warn!(error = %err, limit = %limit, "clamping candidates to transcript bounds");
            let clamped = clamp_candidates(candidates, limit);
            let second = run_pass(&clamped, config);
            validate(&second.segments, config, bounds)?;
            NormalizeOutcome {
                clamped: true,
                ..second
            }
        }
        (Err(err), None) => return Err(err),
    };

    info!(
        candidates = outcome.candidates,
        segments = outcome.segments.len(),
        merged = outcome.merged,
        dropped = outcome.dropped,
        "normalized segments"
    );
    Ok(outcome)
}

fn run_pass(candidates: &[SegmentCandidate], config: NormalizeConfig) -> NormalizeOutcome {
    let mut dropped = 0usize;
    let mut usable: Vec<&SegmentCandidate> = candidates
        .iter()
        .filter(|candidate| {
            let keep = candidate.duration() >= config.min_segment_duration;
            if !keep {
                warn!(
                    start = %candidate.start,
                    end = %candidate.end,
                    description = %candidate.description,
                    "dropping candidate shorter than minimum segment duration"
                );
                dropped += 1;
            }
            keep
        })
        .collect();
    usable.sort_by_key(|candidate| (candidate.start, candidate.end));

    let mut accumulator = SegmentAccumulator::new();
    for candidate in usable {
        accumulator.handle_candidate(candidate, config);
    }
    let merged = accumulator.merged();

    let mut segments = accumulator.into_segments();
    let before = segments.len();
    segments.retain(|segment| segment.duration() >= config.min_segment_duration);
    dropped += before - segments.len();
    for (idx, segment) in segments.iter_mut().enumerate() {
        segment.sequence_index = idx + 1;
    }

    NormalizeOutcome {
        segments,
        candidates: candidates.len(),
        dropped,
        merged,
        clamped: false,
    }
}
