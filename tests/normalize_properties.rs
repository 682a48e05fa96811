use std::time::Duration;

use anyhow::Result;
use talkcut::compression;
use talkcut::normalize::{normalize, validate};
use talkcut::table::{read_segments, write_table};
use talkcut::time::Timestamp;
use talkcut::transcript::parse_transcript;
use talkcut::types::{NormalizeConfig, SegmentCandidate};
use talkcut::Error;

fn secs(start: u64, end: u64, description: &str) -> SegmentCandidate {
    SegmentCandidate::new(
        Timestamp::from_secs(start),
        Timestamp::from_secs(end),
        description,
    )
}

/// Deterministic candidate soup: overlapping, touching, tiny and inverted
/// spans in scrambled order.
fn scrambled_candidates(seed: u64, count: usize) -> Vec<SegmentCandidate> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        state >> 33
    };
    (0..count)
        .map(|i| {
            let start = next() % 600_000;
            let length = next() % 45_000;
            let end = if i % 7 == 0 {
                start.saturating_sub(length)
            } else {
                start + length
            };
            SegmentCandidate::new(
                Timestamp::from_millis(start),
                Timestamp::from_millis(end),
                format!("topic {}", next() % 5),
            )
        })
        .collect()
}

#[test]
fn output_respects_gap_order_and_minimum_duration() -> Result<()> {
    let config = NormalizeConfig::default();
    for seed in 1..=20 {
        let candidates = scrambled_candidates(seed, 40);
        let outcome = normalize(&candidates, config, None)?;

        validate(&outcome.segments, config, None)?;
        for pair in outcome.segments.windows(2) {
            assert!(pair[1].start - pair[0].end >= config.min_gap);
            assert!(pair[0].start < pair[1].start);
            assert_eq!(pair[1].sequence_index, pair[0].sequence_index + 1);
        }
        for segment in &outcome.segments {
            assert!(segment.duration() >= config.min_segment_duration);
        }
    }
    Ok(())
}

#[test]
fn normalizing_normalized_output_changes_nothing() -> Result<()> {
    let config = NormalizeConfig::default();
    for seed in 1..=20 {
        let first = normalize(&scrambled_candidates(seed, 30), config, None)?;
        let again: Vec<SegmentCandidate> =
            first.segments.iter().map(|s| s.to_candidate()).collect();

        let second = normalize(&again, config, None)?;

        assert_eq!(second.segments, first.segments);
        assert_eq!(second.merged, 0);
        assert_eq!(second.dropped, 0);
    }
    Ok(())
}

#[test]
fn close_neighbours_are_fused() -> Result<()> {
    let config = NormalizeConfig::new(Duration::from_secs(2), Duration::from_secs(1));
    let candidates = vec![secs(60, 90, "setup"), secs(91, 120, "payoff")];

    let outcome = normalize(&candidates, config, None)?;

    assert_eq!(outcome.segments.len(), 1);
    assert_eq!(outcome.segments[0].start, Timestamp::from_secs(60));
    assert_eq!(outcome.segments[0].end, Timestamp::from_secs(120));
    assert_eq!(outcome.segments[0].description, "setup; payoff");
    Ok(())
}

#[test]
fn contained_candidate_is_absorbed() -> Result<()> {
    let candidates = vec![secs(0, 60, "whole story"), secs(10, 40, "detail")];

    let outcome = normalize(&candidates, NormalizeConfig::default(), None)?;

    assert_eq!(outcome.segments.len(), 1);
    assert_eq!(outcome.segments[0].end, Timestamp::from_secs(60));
    Ok(())
}

#[test]
fn sub_second_candidate_never_survives() -> Result<()> {
    let candidates = vec![
        secs(0, 20, "intro"),
        SegmentCandidate::new(
            Timestamp::from_secs(100),
            Timestamp::from_millis(100_500),
            "blip",
        ),
        secs(200, 230, "outro"),
    ];

    let outcome = normalize(&candidates, NormalizeConfig::default(), None)?;

    assert_eq!(outcome.segments.len(), 2);
    assert_eq!(outcome.dropped, 1);
    assert!(outcome.segments.iter().all(|s| s.description != "blip"));
    Ok(())
}

#[test]
fn table_round_trip_reproduces_segments() -> Result<()> {
    let mut candidates = scrambled_candidates(7, 25);
    candidates.push(secs(700, 710, "quoted, \"with\" commas"));
    let outcome = normalize(&candidates, NormalizeConfig::default(), None)?;

    let parsed = read_segments(&write_table(&outcome.segments, "mp4"))?;

    assert_eq!(parsed, outcome.segments);
    Ok(())
}

#[test]
fn compression_arithmetic_matches_hand_computation() -> Result<()> {
    let candidates = vec![secs(0, 240, "a"), secs(300, 600, "b")];
    let outcome = normalize(&candidates, NormalizeConfig::default(), None)?;

    let report = compression::evaluate(
        Duration::from_secs(1200),
        &outcome.segments,
        compression::DEFAULT_TARGET_RATIO,
    );

    assert_eq!(report.total_retained_duration, Duration::from_secs(540));
    approx::assert_relative_eq!(report.ratio, 0.45);
    assert!(report.passed);
    Ok(())
}

#[test]
fn malformed_transcript_yields_no_segments() {
    let raw = "1\n00:00:01,000 --> 00:00:04,000\nfine\n\n2\n00:00:09,000 --> 00:00:06,000\nbackwards\n";

    let err = parse_transcript(raw).unwrap_err();

    match err {
        Error::MalformedTranscript { unit, .. } => assert_eq!(unit, 2),
        other => panic!("unexpected error: {other}"),
    }
}
