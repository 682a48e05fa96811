//! Core types for the talkcut selection pipeline

use std::time::Duration;

use srtlib::{Subtitle, Timestamp as SrtTimestamp};

use crate::error::{Error, Result, SegmentSpan};
use crate::time::Timestamp;

/// One timed caption entry of a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptUnit {
    /// 1-based position in the parsed sequence
    pub index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Spoken content; empty for silence markers
    pub text: String,
}

impl TranscriptUnit {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Ordered, non-overlapping transcript units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    units: Vec<TranscriptUnit>,
}

impl Transcript {
    /// Builds a transcript from already timed units, enforcing the same
    /// ordering rules as the subtitle parser.
    pub fn from_units(units: Vec<TranscriptUnit>) -> Result<Self> {
        let mut previous_end = Timestamp::ZERO;
        for unit in &units {
            check_unit_timing(unit.index, unit.start, unit.end, previous_end)?;
            previous_end = unit.end;
        }
        Ok(Self { units })
    }

    pub(crate) fn from_parsed(units: Vec<TranscriptUnit>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[TranscriptUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// End of the last unit; zero for an empty transcript.
    pub fn duration(&self) -> Timestamp {
        self.units.last().map(|unit| unit.end).unwrap_or_default()
    }

    /// Renders the transcript as SubRip text, renumbered from 1.
    pub fn to_srt(&self) -> String {
        let blocks: Vec<String> = (1..)
            .zip(&self.units)
            .map(|(num, unit)| {
                Subtitle::new(
                    num,
                    srt_timestamp(unit.start),
                    srt_timestamp(unit.end),
                    unit.text.clone(),
                )
                .to_string()
            })
            .collect();
        if blocks.is_empty() {
            return String::new();
        }
        let mut out = blocks.join("\n\n");
        out.push('\n');
        out
    }
}

/// srtlib keeps hours in a `u8`; later times saturate at 255 h.
fn srt_timestamp(at: Timestamp) -> SrtTimestamp {
    let (hours, minutes, seconds, millis) = at.parts();
    SrtTimestamp::new(
        u8::try_from(hours).unwrap_or(u8::MAX),
        minutes as u8,
        seconds as u8,
        millis as u16,
    )
}

pub(crate) fn check_unit_timing(
    unit: usize,
    start: Timestamp,
    end: Timestamp,
    previous_end: Timestamp,
) -> Result<()> {
    if end < start {
        return Err(Error::MalformedTranscript {
            unit,
            reason: format!("end {} precedes start {}", end, start),
        });
    }
    if start < previous_end {
        return Err(Error::MalformedTranscript {
            unit,
            reason: format!(
                "start {} precedes the previous unit's end {}",
                start, previous_end
            ),
        });
    }
    Ok(())
}

/// A proposed retain-worthy span, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCandidate {
    pub start: Timestamp,
    pub end: Timestamp,
    pub description: String,
}

impl SegmentCandidate {
    pub fn new(start: Timestamp, end: Timestamp, description: impl Into<String>) -> Self {
        Self {
            start,
            end,
            description: description.into(),
        }
    }

    /// Zero when `end` does not follow `start`.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A final, non-overlapping, gap-respecting output span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSegment {
    /// 1-based, contiguous, matches output order
    pub sequence_index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    pub description: String,
}

impl NormalizedSegment {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// `NNNN.<ext>` with the index zero padded to four digits.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{:04}.{}", self.sequence_index, extension)
    }

    pub fn span(&self) -> SegmentSpan {
        SegmentSpan {
            sequence_index: self.sequence_index,
            start: self.start,
            end: self.end,
        }
    }

    pub fn to_candidate(&self) -> SegmentCandidate {
        SegmentCandidate::new(self.start, self.end, self.description.clone())
    }
}

/// Parameters of the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeConfig {
    /// Required separation between consecutive segments
    pub min_gap: Duration,
    /// Shorter spans cannot hold a complete thought and are dropped
    pub min_segment_duration: Duration,
}

impl NormalizeConfig {
    pub fn new(min_gap: Duration, min_segment_duration: Duration) -> Self {
        Self {
            min_gap,
            min_segment_duration,
        }
    }

    /// `min_gap` on the millisecond grid, rounded up and never below 1 ms, so
    /// neighbouring segments can never touch.
    pub fn min_gap_millis(&self) -> i64 {
        let millis = self.min_gap.as_nanos().div_ceil(1_000_000).max(1);
        i64::try_from(millis).unwrap_or(i64::MAX)
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(1))
    }
}

/// Retained vs. source duration against a target ratio
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionReport {
    pub total_source_duration: Duration,
    pub total_retained_duration: Duration,
    pub ratio: f64,
    pub target_ratio: f64,
    /// `false` is the compression-target-missed warning; advisory only
    pub passed: bool,
    pub segment_count: usize,
    /// Retained time to remove before the target is met
    pub excess: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(index: usize, start: u64, end: u64) -> TranscriptUnit {
        TranscriptUnit {
            index,
            start: Timestamp::from_secs(start),
            end: Timestamp::from_secs(end),
            text: format!("unit {}", index),
        }
    }

    #[test]
    fn transcript_duration_is_last_end() {
        let transcript = Transcript::from_units(vec![unit(1, 0, 2), unit(2, 3, 7)]).unwrap();
        assert_eq!(transcript.duration(), Timestamp::from_secs(7));
        assert_eq!(Transcript::default().duration(), Timestamp::ZERO);
    }

    #[test]
    fn from_units_rejects_overlap() {
        let err = Transcript::from_units(vec![unit(1, 0, 5), unit(2, 4, 7)]).unwrap_err();
        assert!(matches!(err, Error::MalformedTranscript { unit: 2, .. }));
    }

    #[test]
    fn min_gap_rounds_up_to_whole_milliseconds() {
        let gap = |d: Duration| NormalizeConfig::new(d, Duration::from_secs(1)).min_gap_millis();
        assert_eq!(gap(Duration::from_secs(3)), 3000);
        assert_eq!(gap(Duration::from_micros(400)), 1);
        assert_eq!(gap(Duration::from_micros(1500)), 2);
        assert_eq!(gap(Duration::ZERO), 1);
    }

    #[test]
    fn file_name_is_zero_padded() {
        let segment = NormalizedSegment {
            sequence_index: 7,
            start: Timestamp::ZERO,
            end: Timestamp::from_secs(3),
            description: String::new(),
        };
        assert_eq!(segment.file_name("mp4"), "0007.mp4");
    }

    #[test]
    fn to_srt_renders_numbered_blocks() {
        let transcript = Transcript::from_units(vec![unit(4, 0, 2), unit(9, 3, 7)]).unwrap();

        let srt = transcript.to_srt();

        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,000\nunit 4"));
        assert!(srt.contains("2\n00:00:03,000 --> 00:00:07,000\nunit 9"));
        assert!(Transcript::default().to_srt().is_empty());
    }

    #[test]
    fn to_srt_output_parses_back() {
        let transcript = Transcript::from_units(vec![unit(1, 0, 2), unit(2, 3, 7)]).unwrap();

        let parsed = crate::transcript::parse_transcript(&transcript.to_srt()).unwrap();

        assert_eq!(parsed, transcript);
    }
}
