//! Runtime configuration from the environment (and `.env`, when present)

use crate::drift::DetectorOptions;
use crate::similarity::RENAME_THRESHOLD;
use tracing::warn;

pub const ENV_IGNORE_EXTRA_COLUMNS: &str = "PBI_ONTOLOGY_IGNORE_EXTRA_COLUMNS";
pub const ENV_MIN_APPLY_CONFIDENCE: &str = "PBI_ONTOLOGY_MIN_APPLY_CONFIDENCE";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftConfig {
    /// Suppress `EXTRA_COLUMN` findings
    pub ignore_extra_columns: bool,
    /// Lowest fix confidence the `apply` command accepts without review
    pub min_apply_confidence: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            ignore_extra_columns: false,
            min_apply_confidence: RENAME_THRESHOLD,
        }
    }
}

impl DriftConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_IGNORE_EXTRA_COLUMNS) {
            match parse_flag(&raw) {
                Some(flag) => config.ignore_extra_columns = flag,
                None => warn!("Ignoring {}={}: not a boolean", ENV_IGNORE_EXTRA_COLUMNS, raw),
            }
        }

        if let Some(raw) = lookup(ENV_MIN_APPLY_CONFIDENCE) {
            match raw.trim().parse::<f64>() {
                Ok(value) if (0.0..=1.0).contains(&value) => config.min_apply_confidence = value,
                _ => warn!(
                    "Ignoring {}={}: expected a number between 0 and 1",
                    ENV_MIN_APPLY_CONFIDENCE, raw
                ),
            }
        }

        config
    }

    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions {
            ignore_extra_columns: self.ignore_extra_columns,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = DriftConfig::from_lookup(|_| None);
        assert_eq!(config, DriftConfig::default());
        assert_eq!(config.min_apply_confidence, RENAME_THRESHOLD);
    }

    #[test]
    fn test_values_from_lookup() {
        let env = HashMap::from([
            (ENV_IGNORE_EXTRA_COLUMNS, "yes"),
            (ENV_MIN_APPLY_CONFIDENCE, "0.8"),
        ]);
        let config = DriftConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert!(config.ignore_extra_columns);
        assert_eq!(config.min_apply_confidence, 0.8);
        assert!(config.detector_options().ignore_extra_columns);
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let env = HashMap::from([
            (ENV_IGNORE_EXTRA_COLUMNS, "maybe"),
            (ENV_MIN_APPLY_CONFIDENCE, "1.5"),
        ]);
        let config = DriftConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config, DriftConfig::default());
    }
}
