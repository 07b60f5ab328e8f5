//! Tracker configuration

use serde::{Deserialize, Serialize};

/// Configuration for the cascade tracker
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Maximum consecutive missed frames before a confirmed track is deleted
    pub max_age: u32,
    /// Consecutive matched frames before a tentative track is confirmed
    pub min_confirmation_hits: u32,
    /// Minimum detection confidence to spawn a new track
    pub min_confidence: f32,
    /// Weight of the appearance term for a fully mature track, in [0, 1].
    /// The effective weight ramps up with descriptor history length.
    pub appearance_weight: f32,
    /// Descriptor history length at which the appearance term reaches
    /// its full weight
    pub maturity_window: usize,
    /// Squared Mahalanobis distance above which an association is
    /// implausible. Default is the chi-squared 0.95 quantile for 4 degrees
    /// of freedom.
    pub gating_threshold: f32,
    /// Blended costs at or above this value are treated as infeasible
    pub max_cost: f32,
    /// Appearance descriptors retained per track, oldest evicted
    pub feature_history_len: usize,
    /// Diagonal of the measurement noise covariance,
    /// i.e. uncertainties of (x, y, aspect, height) measurements
    pub measurement_noise: [f32; 4],
    /// Diagonal of the process noise covariance,
    /// i.e. uncertainties of (x, y, a, h, vx, vy, va, vh) during transition
    pub process_noise: [f32; 8],
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 30,
            min_confirmation_hits: 3,
            min_confidence: 0.4,
            appearance_weight: 0.75,
            maturity_window: 3,
            gating_threshold: 9.4877,
            max_cost: 0.7,
            feature_history_len: 100,
            measurement_noise: [1.0, 1.0, 0.01, 1.0],
            process_noise: [1.0, 1.0, 0.01, 1.0, 0.01, 0.01, 0.0001, 0.01],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.max_age, 30);
        assert_eq!(cfg.min_confirmation_hits, 3);
        assert!(cfg.appearance_weight > 0.0 && cfg.appearance_weight <= 1.0);
        assert!(cfg.max_cost > 0.0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let cfg = TrackerConfig {
            max_age: 15,
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrackerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_age, 15);
        assert_eq!(back.feature_history_len, cfg.feature_history_len);
    }
}
