//! Multi-target tracker: cascaded matching, track lifecycle, per-frame facade

use crate::config::TrackerConfig;
use crate::cost::build_cost_matrix;
use crate::detection::Detection;
use crate::embedder::{embed_detections, Embedder, GridHistogramEmbedder};
use crate::hungarian;
use crate::track::Track;
use image::RgbImage;
use rayon::prelude::*;

/// A confirmed track emitted for the current frame
#[derive(Debug, Clone)]
pub struct TrackOutput {
    /// Identifier, stable across frames, starts at 1
    pub track_id: u32,
    /// (left, top, right, bottom) clamped to the frame bounds
    pub ltrb: [f32; 4],
    pub class_label: String,
    /// Confidence of the last matched detection
    pub confidence: f32,
}

/// Appearance-aware multi-object tracker.
///
/// Owns the full track set; multiple independent instances can coexist.
/// Call [`Tracker::update`] once per frame with the pre-filtered detections
/// for the tracked class.
pub struct Tracker {
    config: TrackerConfig,
    embedder: Box<dyn Embedder>,
    tracks: Vec<Track>,
    next_id: u32,
    n_frames: u64,
}

impl Tracker {
    /// Create a tracker with the built-in histogram embedder
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_embedder(config, Box::new(GridHistogramEmbedder::default()))
    }

    /// Create a tracker with a custom appearance embedder
    pub fn with_embedder(config: TrackerConfig, embedder: Box<dyn Embedder>) -> Self {
        log::debug!(
            "creating tracker: max_age={}, min_confirmation_hits={}, appearance_weight={:.3}, gating_threshold={:.3}",
            config.max_age,
            config.min_confirmation_hits,
            config.appearance_weight,
            config.gating_threshold
        );
        Self {
            config,
            embedder,
            tracks: Vec::new(),
            next_id: 1,
            n_frames: 0,
        }
    }

    /// Process one frame: predict, embed, associate, update lifecycle, and
    /// return the confirmed tracks.
    pub fn update(&mut self, frame: &RgbImage, detections: Vec<Detection>) -> Vec<TrackOutput> {
        let (frame_w, frame_h) = frame.dimensions();
        let mut detections = self.prefilter(detections);

        embed_detections(self.embedder.as_ref(), frame, &mut detections);
        self.predict_all();

        let (matches, unmatched_dets) = self.cascade_match(&detections);
        self.apply_matches(&detections, matches);
        self.spawn_tracks(&detections, &unmatched_dets);

        self.tracks.retain(|t| !t.is_deleted());
        self.n_frames += 1;

        self.emit(frame_w, frame_h)
    }

    /// Number of live tracks, confirmed or tentative
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Frames processed so far
    pub fn frame_count(&self) -> u64 {
        self.n_frames
    }

    /// Drop every live track. Identifiers are not reset.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Drop malformed detections and those below the confidence floor
    fn prefilter(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|det| {
                if !det.is_well_formed() {
                    log::warn!(
                        "dropping malformed detection: {} conf={}",
                        det.bbox(),
                        det.confidence()
                    );
                    return false;
                }
                det.confidence() >= self.config.min_confidence
            })
            .collect()
    }

    /// Advance every track one frame and force-delete any whose state went
    /// non-finite; a corrupted filter must not survive into matching.
    fn predict_all(&mut self) {
        self.tracks.par_iter_mut().for_each(|track| track.predict());

        self.tracks.retain(|track| {
            if track.is_sound() {
                true
            } else {
                log::warn!("force-deleting track {} with degenerate state", track.id);
                false
            }
        });
    }

    /// Cascaded association: tracks grouped by frames-since-last-match,
    /// most recently seen tier first, each tier matched only against the
    /// detections still unmatched. Returns matched (track_idx, det_idx)
    /// pairs and the surviving unmatched detection indices.
    fn cascade_match(&self, detections: &[Detection]) -> (Vec<(usize, usize)>, Vec<usize>) {
        let mut matches: Vec<(usize, usize)> = Vec::new();
        let mut unmatched_dets: Vec<usize> = (0..detections.len()).collect();

        for tier in 1..=self.config.max_age {
            if unmatched_dets.is_empty() {
                break;
            }

            let tier_tracks: Vec<usize> = self
                .tracks
                .iter()
                .enumerate()
                .filter(|(_, t)| t.time_since_update == tier)
                .map(|(idx, _)| idx)
                .collect();
            if tier_tracks.is_empty() {
                continue;
            }

            let cost = build_cost_matrix(
                &self.tracks,
                &tier_tracks,
                detections,
                &unmatched_dets,
                &self.config,
            );
            let result = hungarian::solve(cost.view(), self.config.max_cost);

            for (row, col) in result.matches {
                matches.push((tier_tracks[row], unmatched_dets[col]));
            }
            unmatched_dets = result
                .unmatched_detections
                .iter()
                .map(|&col| unmatched_dets[col])
                .collect();
        }

        (matches, unmatched_dets)
    }

    /// Apply the association result: update matched tracks, age the rest
    fn apply_matches(&mut self, detections: &[Detection], matches: Vec<(usize, usize)>) {
        let mut matched = vec![false; self.tracks.len()];

        for (track_idx, det_idx) in matches {
            matched[track_idx] = true;
            let track = &mut self.tracks[track_idx];
            let was_tentative = track.is_tentative();

            if track
                .register_match(&detections[det_idx], self.config.min_confirmation_hits)
                .is_err()
            {
                log::warn!("force-deleting track {} after filter failure", track.id);
                track.mark_deleted();
                continue;
            }
            if was_tentative && track.is_confirmed() {
                log::debug!("track {} confirmed", track.id);
            }
        }

        for (idx, track) in self.tracks.iter_mut().enumerate() {
            if !matched[idx] {
                track.mark_missed(self.config.max_age);
            }
        }
    }

    /// Birth a tentative track for each unmatched detection
    fn spawn_tracks(&mut self, detections: &[Detection], unmatched_dets: &[usize]) {
        for &det_idx in unmatched_dets {
            let det = &detections[det_idx];
            let track = Track::new(self.next_id, det, &self.config);
            log::debug!("new tentative track {} at {}", track.id, det.bbox());
            self.tracks.push(track);
            self.next_id += 1;
        }
    }

    /// Confirmed tracks with boxes clamped to the frame
    fn emit(&self, frame_w: u32, frame_h: u32) -> Vec<TrackOutput> {
        self.tracks
            .iter()
            .filter(|t| t.is_confirmed())
            .map(|t| TrackOutput {
                track_id: t.id,
                ltrb: t.bbox().to_ltrb_clamped(frame_w, frame_h),
                class_label: t.class_label().to_string(),
                confidence: t.confidence(),
            })
            .collect()
    }
}
