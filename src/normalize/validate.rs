use crate::error::{Error, Result};
use crate::time::Timestamp;
use crate::types::{NormalizeConfig, NormalizedSegment, SegmentCandidate};

/// Checks the normalized-segment invariants: non-empty spans, contiguous
/// 1-based indices, ascending order without overlap, at least `min_gap`
/// between neighbours, and (when `bounds` is known) no segment past the end
/// of the transcript.
pub fn validate(
    segments: &[NormalizedSegment],
    config: NormalizeConfig,
    bounds: Option<Timestamp>,
) -> Result<()> {
    let min_gap_ms = config.min_gap_millis();

    for (pos, segment) in segments.iter().enumerate() {
        let single = |reason: String| Error::InvalidSegment {
            prev: None,
            next: segment.span(),
            reason,
        };

        if segment.sequence_index != pos + 1 {
            return Err(single(format!(
                "sequence index {} where {} was expected",
                segment.sequence_index,
                pos + 1
            )));
        }
        if segment.end <= segment.start {
            return Err(single("span is empty or inverted".to_string()));
        }
        if let Some(limit) = bounds {
            if segment.end > limit {
                return Err(single(format!("ends after transcript end {}", limit)));
            }
        }

        let Some(prev) = pos.checked_sub(1).map(|p| &segments[p]) else {
            continue;
        };
        let pair = |reason: String| Error::InvalidSegment {
            prev: Some(prev.span()),
            next: segment.span(),
            reason,
        };
        let gap_ms = segment.start.signed_diff(prev.end);
        if gap_ms < 0 {
            return Err(pair("segments overlap or are out of order".to_string()));
        }
        if gap_ms < min_gap_ms {
            return Err(pair(format!(
                "gap of {}ms is below the minimum of {}ms",
                gap_ms, min_gap_ms
            )));
        }
    }

    Ok(())
}

/// Pulls candidate boundaries into `[0, limit]`.
pub(super) fn clamp_candidates(
    candidates: &[SegmentCandidate],
    limit: Timestamp,
) -> Vec<SegmentCandidate> {
    candidates
        .iter()
        .map(|candidate| SegmentCandidate {
            start: candidate.start.min(limit),
            end: candidate.end.min(limit),
            description: candidate.description.clone(),
        })
        .collect()
}
