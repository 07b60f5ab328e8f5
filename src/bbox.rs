//! Bounding box operations and IoU calculations

use ndarray::prelude::*;
use rayon::prelude::*;
use std::fmt;

/// Minimum height/aspect magnitude when converting to measurement space.
/// Guards the filter against zero-height boxes.
pub const MIN_SIZE_EPS: f32 = 1e-3;

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl Bbox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Create from top-left corner plus width/height
    pub fn from_ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            xmin: left,
            ymin: top,
            xmax: left + width,
            ymax: top + height,
        }
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center_x(&self) -> f32 {
        (self.xmin + self.xmax) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.ymin + self.ymax) / 2.0
    }

    /// Convert to bounds array [xmin, ymin, xmax, ymax]
    pub fn to_ltrb(&self) -> [f32; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    /// Bounds clamped to [0, width-1] x [0, height-1]
    pub fn to_ltrb_clamped(&self, frame_width: u32, frame_height: u32) -> [f32; 4] {
        let max_x = (frame_width.saturating_sub(1)) as f32;
        let max_y = (frame_height.saturating_sub(1)) as f32;
        [
            self.xmin.clamp(0.0, max_x),
            self.ymin.clamp(0.0, max_y),
            self.xmax.clamp(0.0, max_x),
            self.ymax.clamp(0.0, max_y),
        ]
    }

    /// Convert to measurement format [center_x, center_y, aspect_ratio, height]
    /// where aspect_ratio = width / height. Height is clamped to a minimum
    /// epsilon so degenerate boxes cannot produce non-finite measurements.
    pub fn to_xyah(&self) -> [f32; 4] {
        let h = self.height().max(MIN_SIZE_EPS);
        let a = (self.width() / h).max(MIN_SIZE_EPS);
        [self.center_x(), self.center_y(), a, h]
    }

    /// Create from measurement format [center_x, center_y, aspect_ratio, height]
    pub fn from_xyah(z: &[f32; 4]) -> Self {
        let h = z[3].max(MIN_SIZE_EPS);
        let w = z[2].max(MIN_SIZE_EPS) * h;
        Self {
            xmin: z[0] - w / 2.0,
            ymin: z[1] - h / 2.0,
            xmax: z[0] + w / 2.0,
            ymax: z[1] + h / 2.0,
        }
    }

    /// True if all four coordinates are finite and the box has positive area
    pub fn is_valid(&self) -> bool {
        self.to_ltrb().iter().all(|v| v.is_finite())
            && self.xmax > self.xmin
            && self.ymax > self.ymin
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bbox({}, {}, {}, {})",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

/// Calculate IoU between two bounding boxes
pub fn iou(a: &Bbox, b: &Bbox) -> f32 {
    let x1 = a.xmin.max(b.xmin);
    let y1 = a.ymin.max(b.ymin);
    let x2 = a.xmax.min(b.xmax);
    let y2 = a.ymax.min(b.ymax);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Pairwise IoU matrix, rows = tracks, columns = detections
pub fn iou_matrix(tracks: &[Bbox], detections: &[Bbox]) -> Array2<f32> {
    let n_tracks = tracks.len();
    let n_dets = detections.len();

    if n_tracks == 0 || n_dets == 0 {
        return Array2::zeros((n_tracks, n_dets));
    }

    let data: Vec<f32> = tracks
        .par_iter()
        .flat_map_iter(|t| detections.iter().map(move |d| iou(t, d)))
        .collect();

    Array2::from_shape_vec((n_tracks, n_dets), data).unwrap()
}
