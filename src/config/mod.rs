use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::compression::DEFAULT_TARGET_RATIO;
use crate::types::NormalizeConfig;

pub const DEFAULT_MIN_GAP_SECONDS: f64 = 3.0;
pub const DEFAULT_MIN_SEGMENT_DURATION_SECONDS: f64 = 1.0;
pub const DEFAULT_FILE_EXTENSION: &str = "mp4";
/// Segments are placed on a millisecond grid.
pub const MIN_GAP_FLOOR_SECONDS: f64 = 0.001;
/// Upper bound for every duration-valued setting (one week).
pub const MAX_DURATION_SECONDS: f64 = 7.0 * 24.0 * 3600.0;

/// Engine parameters. Every key is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(alias = "targetCompressionRatio")]
    pub target_compression_ratio: f64,
    #[serde(alias = "minGapSeconds", alias = "min_gap")]
    pub min_gap_seconds: f64,
    #[serde(alias = "minSegmentDurationSeconds", alias = "min_segment_duration")]
    pub min_segment_duration_seconds: f64,
    #[serde(alias = "fileExtension", alias = "ext")]
    pub file_extension: String,
    #[serde(alias = "oracleTimeoutSeconds")]
    pub oracle_timeout_seconds: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_compression_ratio: DEFAULT_TARGET_RATIO,
            min_gap_seconds: DEFAULT_MIN_GAP_SECONDS,
            min_segment_duration_seconds: DEFAULT_MIN_SEGMENT_DURATION_SECONDS,
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            oracle_timeout_seconds: None,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub target_compression_ratio: Option<f64>,
    pub min_gap_seconds: Option<f64>,
    pub min_segment_duration_seconds: Option<f64>,
    pub file_extension: Option<String>,
    pub oracle_timeout_seconds: Option<f64>,
}

impl EngineConfig {
    /// Defaults, then the optional JSON file, then `overrides`; validated.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_json(&data).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(value) = overrides.target_compression_ratio {
            self.target_compression_ratio = value;
        }
        if let Some(value) = overrides.min_gap_seconds {
            self.min_gap_seconds = value;
        }
        if let Some(value) = overrides.min_segment_duration_seconds {
            self.min_segment_duration_seconds = value;
        }
        if let Some(value) = &overrides.file_extension {
            self.file_extension = value.clone();
        }
        if overrides.oracle_timeout_seconds.is_some() {
            self.oracle_timeout_seconds = overrides.oracle_timeout_seconds;
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.target_compression_ratio.is_finite()
                && self.target_compression_ratio > 0.0
                && self.target_compression_ratio <= 1.0,
            "target_compression_ratio must be in (0, 1], got {}",
            self.target_compression_ratio
        );
        ensure!(
            (MIN_GAP_FLOOR_SECONDS..=MAX_DURATION_SECONDS).contains(&self.min_gap_seconds),
            "min_gap_seconds must be between {} and {}, got {}",
            MIN_GAP_FLOOR_SECONDS,
            MAX_DURATION_SECONDS,
            self.min_gap_seconds
        );
        ensure!(
            self.min_segment_duration_seconds > 0.0
                && self.min_segment_duration_seconds <= MAX_DURATION_SECONDS,
            "min_segment_duration_seconds must be positive and at most {}, got {}",
            MAX_DURATION_SECONDS,
            self.min_segment_duration_seconds
        );
        let ext = self.file_extension.as_str();
        ensure!(
            !ext.is_empty() && !ext.starts_with('.') && !ext.contains(['/', '\\']),
            "file_extension must be a bare extension such as 'mp4', got '{}'",
            ext
        );
        if let Some(timeout) = self.oracle_timeout_seconds {
            ensure!(
                timeout > 0.0 && timeout <= MAX_DURATION_SECONDS,
                "oracle_timeout_seconds must be positive and at most {}, got {}",
                MAX_DURATION_SECONDS,
                timeout
            );
        }
        Ok(())
    }

    /// Out-of-range values are clamped; [`EngineConfig::validate`] reports them.
    pub fn normalize_config(&self) -> NormalizeConfig {
        NormalizeConfig::new(
            bounded_duration(self.min_gap_seconds.max(MIN_GAP_FLOOR_SECONDS)),
            bounded_duration(self.min_segment_duration_seconds),
        )
    }

    pub fn oracle_timeout(&self) -> Option<Duration> {
        self.oracle_timeout_seconds.map(bounded_duration)
    }
}

fn bounded_duration(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs.clamp(0.0, MAX_DURATION_SECONDS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.target_compression_ratio, 0.5);
        assert_eq!(config.normalize_config(), NormalizeConfig::default());
        assert_eq!(config.oracle_timeout(), None);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = EngineConfig::from_json(r#"{"minGapSeconds": 2, "ext": "mkv"}"#).unwrap();
        assert_eq!(config.min_gap_seconds, 2.0);
        assert_eq!(config.file_extension, "mkv");
        assert_eq!(config.min_segment_duration_seconds, 1.0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(EngineConfig::from_json(r#"{"min_gap_secs": 2}"#).is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("talkcut.json");
        fs::write(&path, r#"{"min_gap_seconds": 2.0, "target_compression_ratio": 0.4}"#).unwrap();
        let overrides = ConfigOverrides {
            min_gap_seconds: Some(1.5),
            ..ConfigOverrides::default()
        };

        let config = EngineConfig::resolve(Some(&path), &overrides).unwrap();

        assert_eq!(config.min_gap_seconds, 1.5);
        assert_eq!(config.target_compression_ratio, 0.4);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let bad = [
            ConfigOverrides {
                target_compression_ratio: Some(1.5),
                ..ConfigOverrides::default()
            },
            ConfigOverrides {
                min_gap_seconds: Some(0.0),
                ..ConfigOverrides::default()
            },
            ConfigOverrides {
                file_extension: Some(".mp4".to_string()),
                ..ConfigOverrides::default()
            },
            ConfigOverrides {
                oracle_timeout_seconds: Some(-1.0),
                ..ConfigOverrides::default()
            },
            ConfigOverrides {
                min_gap_seconds: Some(1e300),
                ..ConfigOverrides::default()
            },
            ConfigOverrides {
                min_segment_duration_seconds: Some(1e300),
                ..ConfigOverrides::default()
            },
            ConfigOverrides {
                oracle_timeout_seconds: Some(1e30),
                ..ConfigOverrides::default()
            },
            ConfigOverrides {
                min_gap_seconds: Some(0.0004),
                ..ConfigOverrides::default()
            },
            ConfigOverrides {
                min_gap_seconds: Some(f64::NAN),
                ..ConfigOverrides::default()
            },
        ];
        for overrides in bad {
            assert!(EngineConfig::resolve(None, &overrides).is_err());
        }
    }

    #[test]
    fn json_with_huge_gap_is_rejected_at_load() {
        assert!(EngineConfig::from_json(r#"{"min_gap_seconds": 1e300}"#).is_err());
    }

    #[test]
    fn unvalidated_values_convert_without_panicking() {
        let config = EngineConfig {
            min_gap_seconds: 1e300,
            min_segment_duration_seconds: f64::NAN,
            oracle_timeout_seconds: Some(f64::INFINITY),
            ..EngineConfig::default()
        };

        let normalize = config.normalize_config();

        assert!(config.validate().is_err());
        assert_eq!(normalize.min_gap, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(normalize.min_segment_duration, Duration::ZERO);
        assert_eq!(config.oracle_timeout(), Some(Duration::from_secs(7 * 24 * 3600)));
    }

    #[test]
    fn sub_millisecond_gap_is_raised_to_the_floor() {
        let config = EngineConfig {
            min_gap_seconds: 0.0004,
            ..EngineConfig::default()
        };
        assert_eq!(config.normalize_config().min_gap, Duration::from_millis(1));
    }
}
