//! Tunables for the ingest/propose/apply stages, loaded from the
//! environment so the search radii, proposal cap and rollback window are
//! not hard-coded magic numbers scattered through the services (mirrors
//! `database::DatabaseConnectionInfo::from_env`).

use std::env;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplanConfig {
    /// How close an item must be to a weather event to count as affected.
    pub weather_affect_radius_km: f64,
    /// How close an item must be to a closure event to count as affected.
    pub closure_affect_radius_km: f64,
    /// Search radius for an indoor replacement when an outdoor item is
    /// rained out.
    pub weather_indoor_radius_km: f64,
    /// Search radius for a like-for-like replacement when an item closes.
    pub closure_replacement_radius_km: f64,
    /// Default cap on proposals returned by `propose` when the caller does
    /// not need a different limit.
    pub default_max_proposals: usize,
    /// How long an application stays eligible for rollback.
    pub rollback_window_hours: i64,
}

impl Default for ReplanConfig {
    fn default() -> Self {
        Self {
            weather_affect_radius_km: 5.0,
            closure_affect_radius_km: 0.5,
            weather_indoor_radius_km: 3.0,
            closure_replacement_radius_km: 2.0,
            default_max_proposals: 3,
            rollback_window_hours: 24,
        }
    }
}

impl ReplanConfig {
    /// Reads `REPLAN_*` env vars, falling back to `Default` field-by-field
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            weather_affect_radius_km: env_f64("REPLAN_WEATHER_AFFECT_RADIUS_KM", defaults.weather_affect_radius_km),
            closure_affect_radius_km: env_f64("REPLAN_CLOSURE_AFFECT_RADIUS_KM", defaults.closure_affect_radius_km),
            weather_indoor_radius_km: env_f64(
                "REPLAN_WEATHER_INDOOR_RADIUS_KM",
                defaults.weather_indoor_radius_km,
            ),
            closure_replacement_radius_km: env_f64(
                "REPLAN_CLOSURE_REPLACEMENT_RADIUS_KM",
                defaults.closure_replacement_radius_km,
            ),
            default_max_proposals: env_usize("REPLAN_MAX_PROPOSALS", defaults.default_max_proposals),
            rollback_window_hours: env_i64("REPLAN_ROLLBACK_WINDOW_HOURS", defaults.rollback_window_hours),
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|value| value.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|value| value.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|value| value.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_previously_hard_coded_constants() {
        let config = ReplanConfig::default();
        assert_eq!(config.weather_affect_radius_km, 5.0);
        assert_eq!(config.closure_affect_radius_km, 0.5);
        assert_eq!(config.weather_indoor_radius_km, 3.0);
        assert_eq!(config.closure_replacement_radius_km, 2.0);
        assert_eq!(config.default_max_proposals, 3);
        assert_eq!(config.rollback_window_hours, 24);
    }
}
