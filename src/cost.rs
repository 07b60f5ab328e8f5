//! Blended motion/appearance association costs
//!
//! Each (track, detection) pair is gated first on squared Mahalanobis
//! distance; pairs with implausible motion become infeasible. Feasible pairs
//! blend an IoU-based motion cost with the cosine distance to the track's
//! appearance history, weighting appearance more heavily as the track
//! matures. Pairs missing a descriptor on either side fall back to pure
//! motion cost.

use crate::bbox::iou;
use crate::config::TrackerConfig;
use crate::detection::Detection;
use crate::track::Track;
use ndarray::prelude::*;
use rayon::prelude::*;

/// Cost marking an infeasible pair
pub const INFEASIBLE_COST: f32 = f32::INFINITY;

/// Build the cost matrix for one cascade tier.
///
/// `track_indices` and `det_indices` select the rows/columns from the full
/// track set and detection list; the returned matrix has shape
/// `(track_indices.len(), det_indices.len())`.
pub fn build_cost_matrix(
    tracks: &[Track],
    track_indices: &[usize],
    detections: &[Detection],
    det_indices: &[usize],
    config: &TrackerConfig,
) -> Array2<f32> {
    let n_rows = track_indices.len();
    let n_cols = det_indices.len();

    if n_rows == 0 || n_cols == 0 {
        return Array2::zeros((n_rows, n_cols));
    }

    let data: Vec<f32> = track_indices
        .par_iter()
        .flat_map_iter(|&track_idx| {
            let track = &tracks[track_idx];
            det_indices
                .iter()
                .map(move |&det_idx| pair_cost(track, &detections[det_idx], config))
        })
        .collect();

    Array2::from_shape_vec((n_rows, n_cols), data).unwrap()
}

fn pair_cost(track: &Track, detection: &Detection, config: &TrackerConfig) -> f32 {
    let z = detection.bbox().to_xyah();
    if track.gating_distance(&z) > config.gating_threshold {
        return INFEASIBLE_COST;
    }

    let motion = 1.0 - iou(&track.bbox(), detection.bbox());

    let appearance = detection
        .feature()
        .and_then(|f| track.min_feature_distance(f));

    let cost = match appearance {
        Some(appearance) => {
            let w = blend_weight(track.feature_count(), config);
            w * appearance + (1.0 - w) * motion
        }
        None => motion,
    };

    if cost.is_finite() && cost >= 0.0 {
        cost
    } else {
        INFEASIBLE_COST
    }
}

/// Effective appearance weight: ramps linearly with history length until the
/// track has `maturity_window` descriptors, then stays at
/// `appearance_weight`.
fn blend_weight(history_len: usize, config: &TrackerConfig) -> f32 {
    let maturity = if config.maturity_window == 0 {
        1.0
    } else {
        (history_len as f32 / config.maturity_window as f32).min(1.0)
    };
    config.appearance_weight.clamp(0.0, 1.0) * maturity
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;

    fn unit(v: Vec<f32>) -> Array1<f32> {
        let arr = Array1::from_vec(v);
        let norm = arr.dot(&arr).sqrt();
        arr / norm
    }

    fn track_at(ltwh: [f32; 4], feature: Option<Array1<f32>>, cfg: &TrackerConfig) -> Track {
        let mut d = Detection::new(ltwh, 0.9, "player");
        d.set_feature(feature);
        let mut t = Track::new(1, &d, cfg);
        t.predict();
        t
    }

    #[test]
    fn test_empty_inputs() {
        let cfg = TrackerConfig::default();
        let m = build_cost_matrix(&[], &[], &[], &[], &cfg);
        assert_eq!(m.dim(), (0, 0));
    }

    #[test]
    fn test_gate_marks_far_pairs_infeasible() {
        let cfg = TrackerConfig::default();
        let track = track_at([10.0, 10.0, 40.0, 90.0], None, &cfg);
        let near = Detection::new([12.0, 11.0, 40.0, 90.0], 0.9, "player");
        let far = Detection::new([900.0, 700.0, 40.0, 90.0], 0.9, "player");

        let m = build_cost_matrix(
            &[track],
            &[0],
            &[near, far],
            &[0, 1],
            &cfg,
        );
        assert!(m[(0, 0)].is_finite());
        assert_eq!(m[(0, 1)], INFEASIBLE_COST);
    }

    #[test]
    fn test_identical_box_zero_motion_cost() {
        let cfg = TrackerConfig::default();
        let track = track_at([10.0, 10.0, 40.0, 90.0], None, &cfg);
        let same = Detection::new([10.0, 10.0, 40.0, 90.0], 0.9, "player");

        let m = build_cost_matrix(&[track], &[0], &[same], &[0], &cfg);
        assert_abs_diff_eq!(m[(0, 0)], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_missing_descriptor_uses_motion_only() {
        let cfg = TrackerConfig::default();
        // Track has appearance history; the detection's crop failed to embed.
        let track = track_at(
            [10.0, 10.0, 40.0, 90.0],
            Some(unit(vec![1.0, 0.0, 0.0])),
            &cfg,
        );
        let mut det = Detection::new([10.0, 10.0, 40.0, 90.0], 0.9, "player");
        det.set_feature(None);

        let m = build_cost_matrix(&[track], &[0], &[det], &[0], &cfg);
        assert_abs_diff_eq!(m[(0, 0)], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_appearance_separates_overlapping_targets() {
        let cfg = TrackerConfig {
            maturity_window: 1,
            ..Default::default()
        };
        let red = unit(vec![1.0, 0.0, 0.0]);
        let blue = unit(vec![0.0, 0.0, 1.0]);

        let track = track_at([10.0, 10.0, 40.0, 90.0], Some(red.clone()), &cfg);

        let mut same_look = Detection::new([10.0, 10.0, 40.0, 90.0], 0.9, "player");
        same_look.set_feature(Some(red));
        let mut other_look = Detection::new([10.0, 10.0, 40.0, 90.0], 0.9, "player");
        other_look.set_feature(Some(blue));

        let m = build_cost_matrix(
            &[track],
            &[0],
            &[same_look, other_look],
            &[0, 1],
            &cfg,
        );
        assert!(m[(0, 0)] < m[(0, 1)]);
        assert!(m[(0, 1)] >= cfg.appearance_weight * 0.99);
    }

    #[test]
    fn test_blend_weight_ramps_with_maturity() {
        let cfg = TrackerConfig {
            appearance_weight: 0.8,
            maturity_window: 4,
            ..Default::default()
        };
        assert_abs_diff_eq!(blend_weight(0, &cfg), 0.0);
        assert_abs_diff_eq!(blend_weight(2, &cfg), 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(blend_weight(4, &cfg), 0.8, epsilon = 1e-6);
        assert_abs_diff_eq!(blend_weight(100, &cfg), 0.8, epsilon = 1e-6);
    }
}
