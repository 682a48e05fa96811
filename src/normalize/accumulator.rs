use tracing::debug;

use crate::time::Timestamp;
use crate::types::{NormalizeConfig, NormalizedSegment, SegmentCandidate};

const DESCRIPTION_SEPARATOR: &str = "; ";

struct OpenSegment {
    start: Timestamp,
    end: Timestamp,
    /// Description of the opening candidate, verbatim until something merges.
    original: String,
    descriptions: Vec<String>,
    absorbed: bool,
}

impl OpenSegment {
    fn open(candidate: &SegmentCandidate) -> Self {
        let mut segment = Self {
            start: candidate.start,
            end: candidate.end,
            original: candidate.description.clone(),
            descriptions: Vec::new(),
            absorbed: false,
        };
        segment.push_parts(&candidate.description);
        segment
    }

    fn absorb_description(&mut self, incoming: &str) {
        self.absorbed = true;
        self.push_parts(incoming);
    }

    fn push_parts(&mut self, incoming: &str) {
        for part in incoming.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let lowered = part.to_lowercase();
            if !self
                .descriptions
                .iter()
                .any(|known| known.to_lowercase() == lowered)
            {
                self.descriptions.push(part.to_string());
            }
        }
    }
}

/// Walks start-sorted candidates and fuses every candidate that begins less
/// than `min_gap` after the open segment's end.
pub(super) struct SegmentAccumulator {
    closed: Vec<OpenSegment>,
    current: Option<OpenSegment>,
    merged: usize,
}

impl SegmentAccumulator {
    pub(super) fn new() -> Self {
        Self {
            closed: Vec::new(),
            current: None,
            merged: 0,
        }
    }

    pub(super) fn handle_candidate(&mut self, candidate: &SegmentCandidate, config: NormalizeConfig) {
        let Some(current) = self.current.as_mut() else {
            self.current = Some(OpenSegment::open(candidate));
            return;
        };

        // Negative when the candidate overlaps the open segment.
        let gap_ms = candidate.start.signed_diff(current.end);
        if gap_ms < config.min_gap_millis() {
            if candidate.end > current.end {
                debug!(
                    start = %current.start,
                    from = %current.end,
                    to = %candidate.end,
                    gap_ms,
                    "extending segment"
                );
                current.end = candidate.end;
            } else {
                debug!(start = %candidate.start, end = %candidate.end, "absorbing contained candidate");
            }
            current.absorb_description(&candidate.description);
            self.merged += 1;
            return;
        }

        self.finish_segment();
        self.current = Some(OpenSegment::open(candidate));
    }

    pub(super) fn finish_segment(&mut self) {
        if let Some(segment) = self.current.take() {
            self.closed.push(segment);
        }
    }

    pub(super) fn merged(&self) -> usize {
        self.merged
    }

    /// Closed segments, indexed `1..=N` in order.
    pub(super) fn into_segments(mut self) -> Vec<NormalizedSegment> {
        self.finish_segment();
        self.closed
            .into_iter()
            .enumerate()
            .map(|(idx, segment)| NormalizedSegment {
                sequence_index: idx + 1,
                start: segment.start,
                end: segment.end,
                description: if segment.absorbed {
                    segment.descriptions.join(DESCRIPTION_SEPARATOR)
                } else {
                    segment.original
                },
            })
            .collect()
    }
}
