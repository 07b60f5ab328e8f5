//! Single-target track: motion filter, lifecycle state, appearance history

use crate::bbox::Bbox;
use crate::config::TrackerConfig;
use crate::detection::Detection;
use crate::embedder::{cosine_distance, Descriptor};
use crate::kalman::KalmanFilter;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Lifecycle state of a track.
///
/// New tracks are `Tentative` until they accumulate enough consecutive
/// matches, then `Confirmed`. `Deleted` is terminal; a reappearing target
/// gets a fresh identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackState {
    Tentative,
    Confirmed,
    Deleted,
}

/// A single tracked target
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique identifier, never reused
    pub id: u32,
    filter: KalmanFilter,
    state: TrackState,
    /// Consecutive matched frames
    pub hits: u32,
    /// Frames since the last successful match
    pub time_since_update: u32,
    /// Total prediction steps this track has lived
    pub age: u32,
    /// Recent appearance descriptors, oldest evicted on overflow
    features: VecDeque<Descriptor>,
    feature_capacity: usize,
    class_label: String,
    confidence: f32,
}

impl Track {
    /// Spawn a tentative track from an unmatched detection
    pub fn new(id: u32, detection: &Detection, config: &TrackerConfig) -> Self {
        let filter = KalmanFilter::new(
            detection.bbox(),
            config.measurement_noise,
            config.process_noise,
        );

        let mut features = VecDeque::with_capacity(config.feature_history_len);
        if let Some(feature) = detection.feature() {
            features.push_back(feature.clone());
        }

        Self {
            id,
            filter,
            state: TrackState::Tentative,
            hits: 1,
            time_since_update: 0,
            age: 0,
            features,
            feature_capacity: config.feature_history_len.max(1),
            class_label: detection.class_label().to_string(),
            confidence: detection.confidence(),
        }
    }

    /// Advance the motion state one frame. Must run before matching.
    pub fn predict(&mut self) {
        self.filter.predict();
        self.age += 1;
        self.time_since_update += 1;
    }

    /// Fold a matched detection into the track: filter correction, appearance
    /// history append, confirmation bookkeeping.
    pub fn register_match(&mut self, detection: &Detection, min_confirmation_hits: u32) -> Result<()> {
        self.filter.update(&detection.bbox().to_xyah())?;

        if let Some(feature) = detection.feature() {
            if self.features.len() >= self.feature_capacity {
                self.features.pop_front();
            }
            self.features.push_back(feature.clone());
        }

        self.hits += 1;
        self.time_since_update = 0;
        self.confidence = detection.confidence();

        if self.state == TrackState::Tentative && self.hits >= min_confirmation_hits {
            self.state = TrackState::Confirmed;
        }
        Ok(())
    }

    /// Register a frame with no matching detection. Tentative tracks die
    /// immediately; confirmed tracks survive up to `max_age` misses.
    pub fn mark_missed(&mut self, max_age: u32) {
        match self.state {
            TrackState::Tentative => self.state = TrackState::Deleted,
            TrackState::Confirmed if self.time_since_update > max_age => {
                self.state = TrackState::Deleted;
            }
            _ => {}
        }
    }

    /// Force the track into the terminal state, e.g. after a numeric failure
    pub fn mark_deleted(&mut self) {
        self.state = TrackState::Deleted;
    }

    /// Current box estimate from the motion filter
    pub fn bbox(&self) -> Bbox {
        self.filter.bbox()
    }

    /// Squared Mahalanobis distance from the predicted state to a
    /// measurement in (cx, cy, a, h) space
    pub fn gating_distance(&self, z: &[f32; 4]) -> f32 {
        self.filter.gating_distance(z)
    }

    /// Smallest cosine distance between a descriptor and the stored history.
    /// `None` when the track has no appearance history yet.
    pub fn min_feature_distance(&self, feature: &Descriptor) -> Option<f32> {
        self.features
            .iter()
            .map(|f| cosine_distance(f, feature))
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn class_label(&self) -> &str {
        &self.class_label
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn is_tentative(&self) -> bool {
        self.state == TrackState::Tentative
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    pub fn is_deleted(&self) -> bool {
        self.state == TrackState::Deleted
    }

    /// True if the motion state is numerically sound and the predicted box
    /// still has positive extent
    pub fn is_sound(&self) -> bool {
        self.filter.is_finite() && self.bbox().is_valid()
    }
}
