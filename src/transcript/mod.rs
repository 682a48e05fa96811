//! Transcript parsing - SubRip and WebVTT caption text to ordered units
//!
//! Pure transform: the caller reads the file, this module only looks at text.
//! Timing lines accept `HH:MM:SS,mmm`, `HH:MM:SS.mmm` and the VTT short form
//! `MM:SS.mmm`. Structural problems abort the whole parse.

use tracing::debug;

use crate::error::{Error, Result};
use crate::time::{parse_clock, Timestamp};
use crate::types::{check_unit_timing, Transcript, TranscriptUnit};

const TIMING_ARROW: &str = "-->";
const VTT_SKIPPED_BLOCKS: [&str; 3] = ["NOTE", "STYLE", "REGION"];

/// Parse caption text into a [`Transcript`].
///
/// Units with empty text are kept as silence markers. Zero-length cues carry
/// no time and are skipped.
pub fn parse_transcript(raw: &str) -> Result<Transcript> {
    let text = raw
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut units: Vec<TranscriptUnit> = Vec::new();
    let mut previous_end = Timestamp::ZERO;
    let mut cue_number = 0usize;

    for (block_idx, block) in split_blocks(&text).into_iter().enumerate() {
        let first = block[0].trim();
        if block_idx == 0 && first.starts_with("WEBVTT") {
            continue;
        }
        if VTT_SKIPPED_BLOCKS
            .iter()
            .any(|kw| first == *kw || first.starts_with(&format!("{} ", kw)))
        {
            continue;
        }

        cue_number += 1;
        let timing_idx = block
            .iter()
            .take(2)
            .position(|line| line.contains(TIMING_ARROW))
            .ok_or_else(|| Error::MalformedTranscript {
                unit: cue_number,
                reason: format!("no timing line in block starting with '{}'", first),
            })?;

        let (start, end) = parse_timing_line(block[timing_idx], cue_number)?;
        check_unit_timing(cue_number, start, end, previous_end)?;

        if end == start {
            debug!(cue = cue_number, at = %start, "skipping zero-length cue");
            continue;
        }

        let text = block[timing_idx + 1..]
            .iter()
            .map(|line| strip_markup(line.trim()))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        units.push(TranscriptUnit {
            index: units.len() + 1,
            start,
            end,
            text,
        });
        previous_end = end;
    }

    debug!(units = units.len(), "parsed transcript");
    Ok(Transcript::from_parsed(units))
}

fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn parse_timing_line(line: &str, cue: usize) -> Result<(Timestamp, Timestamp)> {
    let malformed = |reason: String| Error::MalformedTranscript { unit: cue, reason };

    let (left, right) = line
        .split_once(TIMING_ARROW)
        .ok_or_else(|| malformed(format!("timing line '{}' has no arrow", line)))?;
    // VTT cue settings may follow the end timestamp.
    let end_raw = right.split_whitespace().next().unwrap_or_default();

    let start = parse_clock(left).map_err(|err| malformed(format!("bad start time: {:#}", err)))?;
    let end = parse_clock(end_raw).map_err(|err| malformed(format!("bad end time: {:#}", err)))?;
    Ok((start, end))
}

/// Drops `<...>` markup such as `<i>` or VTT word timing tags.
fn strip_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut depth = 0usize;
    for ch in line.chars() {
        match ch {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}
