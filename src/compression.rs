//! Compression check - retained duration against the source duration
//!
//! Never mutates segments and never fails: a missed target is reported through
//! `CompressionReport::passed` and left to the caller's policy.

use std::time::Duration;

use tracing::{info, warn};

use crate::types::{CompressionReport, NormalizedSegment};

/// Target used when the caller does not configure one.
pub const DEFAULT_TARGET_RATIO: f64 = 0.5;

pub fn evaluate(
    source_duration: Duration,
    segments: &[NormalizedSegment],
    target_ratio: f64,
) -> CompressionReport {
    let retained: Duration = segments.iter().map(NormalizedSegment::duration).sum();

    let ratio = if source_duration.is_zero() {
        0.0
    } else {
        retained.as_secs_f64() / source_duration.as_secs_f64()
    };
    let passed = ratio <= target_ratio;

    let allowed = Duration::from_secs_f64((source_duration.as_secs_f64() * target_ratio).max(0.0));
    let excess = if passed {
        Duration::ZERO
    } else {
        retained.saturating_sub(allowed)
    };

    if passed {
        info!(ratio, target_ratio, segments = segments.len(), "compression target met");
    } else {
        warn!(
            ratio,
            target_ratio,
            excess_secs = excess.as_secs_f64(),
            "compression target missed"
        );
    }

    CompressionReport {
        total_source_duration: source_duration,
        total_retained_duration: retained,
        ratio,
        target_ratio,
        passed,
        segment_count: segments.len(),
        excess,
    }
}
