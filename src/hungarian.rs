//! Minimum-cost bipartite assignment with a feasibility gate
//!
//! Rows are tracks, columns are detections. Entries at or above the gate
//! (including infinity) are infeasible; assignments resolving to an
//! infeasible entry are rejected and both endpoints returned unmatched.

use ndarray::ArrayView2;
use pathfinding::prelude::{kuhn_munkres_min, Matrix};

/// Scale applied when converting float costs to the integer weights the
/// dense solver operates on.
const COST_SCALE: f32 = 1000.0;
/// Integer weight standing in for an infeasible pair
const INFEASIBLE: i64 = 1_000_000;

/// Result of one assignment round
#[derive(Debug, Clone)]
pub struct AssignmentResult {
    /// Matched (track_idx, detection_idx) pairs
    pub matches: Vec<(usize, usize)>,
    /// Track row indices left unmatched
    pub unmatched_tracks: Vec<usize>,
    /// Detection column indices left unmatched
    pub unmatched_detections: Vec<usize>,
}

impl AssignmentResult {
    fn all_unmatched(n_tracks: usize, n_dets: usize) -> Self {
        Self {
            matches: Vec::new(),
            unmatched_tracks: (0..n_tracks).collect(),
            unmatched_detections: (0..n_dets).collect(),
        }
    }

    fn from_matches(matches: Vec<(usize, usize)>, n_tracks: usize, n_dets: usize) -> Self {
        let mut track_used = vec![false; n_tracks];
        let mut det_used = vec![false; n_dets];
        for &(t, d) in &matches {
            track_used[t] = true;
            det_used[d] = true;
        }

        Self {
            matches,
            unmatched_tracks: (0..n_tracks).filter(|&i| !track_used[i]).collect(),
            unmatched_detections: (0..n_dets).filter(|&i| !det_used[i]).collect(),
        }
    }
}

/// Solve the assignment problem for a cost matrix.
///
/// Picks the optimal Kuhn-Munkres solution on dense matrices and a greedy
/// pass on sparse ones (most pairs gated), which is much faster and equal in
/// practice when few pairs are feasible. Both paths are deterministic:
/// ties resolve to the lowest track index, then the lowest detection index.
pub fn solve(cost_matrix: ArrayView2<f32>, gate: f32) -> AssignmentResult {
    let n_tracks = cost_matrix.nrows();
    let n_dets = cost_matrix.ncols();

    if n_tracks == 0 || n_dets == 0 {
        return AssignmentResult::all_unmatched(n_tracks, n_dets);
    }

    let feasible = cost_matrix
        .iter()
        .filter(|&&c| c.is_finite() && c < gate)
        .count();
    if feasible == 0 {
        return AssignmentResult::all_unmatched(n_tracks, n_dets);
    }

    if feasible < n_tracks * n_dets / 4 {
        solve_greedy(cost_matrix, gate)
    } else {
        solve_dense(cost_matrix, gate)
    }
}

fn weight(cost: f32, gate: f32) -> i64 {
    if cost.is_finite() && cost < gate {
        (cost * COST_SCALE) as i64
    } else {
        INFEASIBLE
    }
}

/// Optimal assignment via Kuhn-Munkres on a square-padded integer matrix
fn solve_dense(cost_matrix: ArrayView2<f32>, gate: f32) -> AssignmentResult {
    let n_tracks = cost_matrix.nrows();
    let n_dets = cost_matrix.ncols();
    let size = n_tracks.max(n_dets);

    let mut weights = Matrix::new(size, size, INFEASIBLE);
    for i in 0..n_tracks {
        for j in 0..n_dets {
            weights[(i, j)] = weight(cost_matrix[(i, j)], gate);
        }
    }

    let (_, assignment) = kuhn_munkres_min(&weights);

    let matches: Vec<(usize, usize)> = assignment
        .iter()
        .enumerate()
        .filter(|&(track_idx, &det_idx)| {
            track_idx < n_tracks && det_idx < n_dets && weights[(track_idx, det_idx)] < INFEASIBLE
        })
        .map(|(track_idx, &det_idx)| (track_idx, det_idx))
        .collect();

    AssignmentResult::from_matches(matches, n_tracks, n_dets)
}

/// Greedy assignment for sparse matrices: best feasible pair first
fn solve_greedy(cost_matrix: ArrayView2<f32>, gate: f32) -> AssignmentResult {
    let n_tracks = cost_matrix.nrows();
    let n_dets = cost_matrix.ncols();

    let mut candidates: Vec<(f32, usize, usize)> = Vec::new();
    for i in 0..n_tracks {
        for j in 0..n_dets {
            let cost = cost_matrix[(i, j)];
            if cost.is_finite() && cost < gate {
                candidates.push((cost, i, j));
            }
        }
    }

    candidates.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    let mut track_used = vec![false; n_tracks];
    let mut det_used = vec![false; n_dets];
    let mut matches = Vec::new();

    for (_, track_idx, det_idx) in candidates {
        if !track_used[track_idx] && !det_used[det_idx] {
            track_used[track_idx] = true;
            det_used[det_idx] = true;
            matches.push((track_idx, det_idx));
        }
    }

    matches.sort_unstable();
    AssignmentResult::from_matches(matches, n_tracks, n_dets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_empty_matrix_all_unmatched() {
        let empty = ndarray::Array2::<f32>::zeros((0, 3));
        let result = solve(empty.view(), 0.7);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_detections, vec![0, 1, 2]);

        let empty = ndarray::Array2::<f32>::zeros((2, 0));
        let result = solve(empty.view(), 0.7);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_tracks, vec![0, 1]);
    }

    #[test]
    fn test_diagonal_preferred() {
        let cost = array![[0.1, 0.9], [0.9, 0.1]];
        let result = solve(cost.view(), 1.0);
        assert_eq!(result.matches, vec![(0, 0), (1, 1)]);
        assert!(result.unmatched_tracks.is_empty());
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_optimal_over_greedy_choice() {
        // Greedy on raw order would take (0,0); the optimal total picks
        // (0,1) and (1,0).
        let cost = array![[0.2, 0.3], [0.25, 0.9]];
        let result = solve(cost.view(), 1.0);
        assert_eq!(result.matches.len(), 2);
        let total: f32 = result
            .matches
            .iter()
            .map(|&(t, d)| cost[(t, d)])
            .sum();
        assert!(total <= 0.56);
    }

    #[test]
    fn test_all_gated_yields_no_matches() {
        let cost = array![[0.8, 0.95], [f32::INFINITY, 0.71]];
        let result = solve(cost.view(), 0.7);
        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched_tracks, vec![0, 1]);
        assert_eq!(result.unmatched_detections, vec![0, 1]);
    }

    #[test]
    fn test_gated_pair_rejected_rectangular() {
        // Three tracks, one detection; only track 1 is feasible.
        let cost = array![[f32::INFINITY], [0.3], [0.8]];
        let result = solve(cost.view(), 0.7);
        assert_eq!(result.matches, vec![(1, 0)]);
        assert_eq!(result.unmatched_tracks, vec![0, 2]);
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_one_to_one_matching() {
        let cost = array![
            [0.1, 0.2, 0.3],
            [0.2, 0.1, 0.3],
            [0.3, 0.2, 0.1],
            [0.15, 0.25, 0.35],
        ];
        let result = solve(cost.view(), 1.0);

        let mut tracks_seen = std::collections::HashSet::new();
        let mut dets_seen = std::collections::HashSet::new();
        for &(t, d) in &result.matches {
            assert!(tracks_seen.insert(t), "track matched twice");
            assert!(dets_seen.insert(d), "detection matched twice");
        }
        assert_eq!(result.matches.len(), 3);
        assert_eq!(result.unmatched_tracks.len(), 1);
    }

    #[test]
    fn test_sparse_path_deterministic_tie_break() {
        // Mostly-gated matrix forces the greedy path; two equal-cost pairs
        // for the same detection resolve to the lower track index.
        let mut cost = ndarray::Array2::<f32>::from_elem((4, 4), f32::INFINITY);
        cost[(1, 2)] = 0.4;
        cost[(3, 2)] = 0.4;

        let first = solve(cost.view(), 0.7);
        assert_eq!(first.matches, vec![(1, 2)]);
        for _ in 0..5 {
            let again = solve(cost.view(), 0.7);
            assert_eq!(again.matches, first.matches);
        }
    }
}
