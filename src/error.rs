use std::time::Duration;

use thiserror::Error;

use crate::time::Timestamp;

/// Convenient alias for results returned by the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transcript timing is structurally invalid. No partial parse survives.
    #[error("malformed transcript at unit {unit}: {reason}")]
    MalformedTranscript { unit: usize, reason: String },

    /// A normalized segment list broke one of its invariants.
    #[error("invalid segment {}: {reason}", describe_pair(.prev, .next))]
    InvalidSegment {
        prev: Option<SegmentSpan>,
        next: SegmentSpan,
        reason: String,
    },

    #[error("selection oracle unavailable: {0}")]
    OracleUnavailable(#[from] OracleError),

    #[error("malformed segment table at line {line}: {reason}")]
    MalformedTable { line: usize, reason: String },
}

/// Failure of the external selection step, surfaced to the caller unchanged.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("{0}")]
    Failed(String),
    #[error("no answer within {0:?}")]
    TimedOut(Duration),
    #[error("selection cancelled")]
    Cancelled,
    #[error("unusable oracle output: {0}")]
    BadOutput(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Boundaries of a segment named in an [`Error::InvalidSegment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSpan {
    pub sequence_index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl std::fmt::Display for SegmentSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} [{} - {}]", self.sequence_index, self.start, self.end)
    }
}

fn describe_pair(prev: &Option<SegmentSpan>, next: &SegmentSpan) -> String {
    match prev {
        Some(prev) => format!("{} -> {}", prev, next),
        None => next.to_string(),
    }
}
