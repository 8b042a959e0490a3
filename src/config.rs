//! Environment settings for the segment subsystem.
//!
//! Every value has a default; malformed numbers and sample intervals
//! below [`MIN_SAMPLE_INTERVAL_M`] are errors.

use serde::{Deserialize, Serialize};

use crate::error::{ClimbError, Result};
use crate::segments::MatchConfig;

/// Smallest accepted spacing (m) between explore queries.
pub const MIN_SAMPLE_INTERVAL_M: f64 = 1.0;

/// Settings read from the process environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub strava_client_id: String,
    pub strava_client_secret: String,
    pub strava_redirect_uri: String,
    /// SQLite file for the segment cache
    pub cache_db: String,
    /// Spacing (m) between explore queries along the route
    pub sample_interval_m: f64,
    /// Half-size (m) of each explore box
    pub explore_radius_m: f64,
    /// Minimum overlap fraction for a segment match
    pub overlap_threshold: f64,
    /// Pause (s) between API calls
    pub pause_between_calls_s: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strava_client_id: String::new(),
            strava_client_secret: String::new(),
            strava_redirect_uri: "http://localhost:8000/strava/callback".to_string(),
            cache_db: "./climb_cache.sqlite".to_string(),
            sample_interval_m: 500.0,
            explore_radius_m: 150.0,
            overlap_threshold: 0.6,
            pause_between_calls_s: 0.25,
        }
    }
}

fn parse_number(key: &str, raw: Option<String>, default: f64) -> Result<f64> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ClimbError::ConfigError {
                message: format!("{} must be a number, got '{}'", key, value),
            }),
    }
}

impl Settings {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup; missing keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);

        let sample_interval_m = parse_number(
            "SAMPLE_INTERVAL_M",
            lookup("SAMPLE_INTERVAL_M"),
            defaults.sample_interval_m,
        )?;
        if sample_interval_m < MIN_SAMPLE_INTERVAL_M {
            return Err(ClimbError::ConfigError {
                message: format!(
                    "SAMPLE_INTERVAL_M must be at least {} m, got {}",
                    MIN_SAMPLE_INTERVAL_M, sample_interval_m
                ),
            });
        }

        Ok(Self {
            strava_client_id: text("STRAVA_CLIENT_ID", defaults.strava_client_id),
            strava_client_secret: text("STRAVA_CLIENT_SECRET", defaults.strava_client_secret),
            strava_redirect_uri: text("STRAVA_REDIRECT_URI", defaults.strava_redirect_uri),
            cache_db: text("CACHE_DB", defaults.cache_db),
            sample_interval_m,
            explore_radius_m: parse_number(
                "EXPLORE_RADIUS_M",
                lookup("EXPLORE_RADIUS_M"),
                defaults.explore_radius_m,
            )?,
            overlap_threshold: parse_number(
                "OVERLAP_THRESHOLD",
                lookup("OVERLAP_THRESHOLD"),
                defaults.overlap_threshold,
            )?,
            pause_between_calls_s: parse_number(
                "PAUSE_BETWEEN_CALLS",
                lookup("PAUSE_BETWEEN_CALLS"),
                defaults.pause_between_calls_s,
            )?,
        })
    }

    /// Matching config using this overlap threshold.
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            overlap_threshold: self.overlap_threshold,
            ..MatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.sample_interval_m, 500.0);
        assert_eq!(settings.explore_radius_m, 150.0);
        assert_eq!(settings.pause_between_calls_s, 0.25);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("STRAVA_CLIENT_ID", "12345"),
            ("CACHE_DB", "/tmp/segments.sqlite"),
            ("SAMPLE_INTERVAL_M", " 250 "),
            ("OVERLAP_THRESHOLD", "0.75"),
        ]))
        .unwrap();
        assert_eq!(settings.strava_client_id, "12345");
        assert_eq!(settings.cache_db, "/tmp/segments.sqlite");
        assert_eq!(settings.sample_interval_m, 250.0);
        assert_eq!(settings.match_config().overlap_threshold, 0.75);
        assert_eq!(settings.match_config().tolerance_m, 30.0);
    }

    #[test]
    fn test_malformed_number() {
        let err = Settings::from_lookup(lookup_from(&[("EXPLORE_RADIUS_M", "wide")])).unwrap_err();
        assert!(matches!(err, ClimbError::ConfigError { .. }));
        assert!(err.to_string().contains("EXPLORE_RADIUS_M"));

        assert!(Settings::from_lookup(lookup_from(&[("PAUSE_BETWEEN_CALLS", "NaN")])).is_err());
    }

    #[test]
    fn test_sample_interval_lower_bound() {
        for raw in ["1e-9", "0", "-500", "0.5"] {
            let err = Settings::from_lookup(lookup_from(&[("SAMPLE_INTERVAL_M", raw)])).unwrap_err();
            assert!(matches!(err, ClimbError::ConfigError { .. }), "{}", raw);
            assert!(err.to_string().contains("SAMPLE_INTERVAL_M"));
        }
        let settings = Settings::from_lookup(lookup_from(&[("SAMPLE_INTERVAL_M", "1")])).unwrap();
        assert_eq!(settings.sample_interval_m, MIN_SAMPLE_INTERVAL_M);
    }
}
