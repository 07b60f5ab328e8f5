//! Appearance descriptors for re-identification
//!
//! An [`Embedder`] maps a frame crop to a fixed-length, L2-normalized
//! descriptor. Embedding can fail (zero-area or fully out-of-frame crop);
//! callers receive `None` and must fall back to motion-only matching.

use crate::bbox::Bbox;
use crate::detection::Detection;
use image::RgbImage;
use ndarray::prelude::*;
use rayon::prelude::*;

/// Fixed-length appearance descriptor, unit L2 norm
pub type Descriptor = Array1<f32>;

/// Maps an image region to an appearance descriptor.
///
/// Implementations must be deterministic for identical pixel input and must
/// return `None` (never panic) for degenerate regions.
pub trait Embedder: Send + Sync {
    /// Descriptor length produced by this embedder
    fn dim(&self) -> usize;

    /// Compute the descriptor for `bbox` clipped to the frame bounds.
    /// Returns `None` if the clipped region has no area.
    fn embed(&self, frame: &RgbImage, bbox: &Bbox) -> Option<Descriptor>;
}

/// Cosine distance between two unit-norm descriptors, clamped to be
/// non-negative against rounding.
pub fn cosine_distance(a: &Descriptor, b: &Descriptor) -> f32 {
    (1.0 - a.dot(b)).max(0.0)
}

/// Compute descriptors for every detection in parallel. Detections whose
/// crop cannot be embedded keep `feature = None`.
pub fn embed_detections(embedder: &dyn Embedder, frame: &RgbImage, detections: &mut [Detection]) {
    detections.par_iter_mut().for_each(|det| {
        let feature = embedder.embed(frame, det.bbox());
        det.set_feature(feature);
    });
}

/// Spatial color-histogram embedder.
///
/// The clipped crop is divided into a `cells x cells` grid; each cell
/// accumulates a per-channel intensity histogram with `bins` buckets. The
/// concatenated histogram is L2-normalized. Coarse but deterministic, and
/// discriminative enough to separate differently-colored targets.
#[derive(Debug, Clone)]
pub struct GridHistogramEmbedder {
    cells: u32,
    bins: u32,
}

impl GridHistogramEmbedder {
    pub fn new(cells: u32, bins: u32) -> Self {
        assert!(cells > 0 && bins > 0 && bins <= 256);
        Self { cells, bins }
    }
}

impl Default for GridHistogramEmbedder {
    fn default() -> Self {
        Self { cells: 2, bins: 8 }
    }
}

impl Embedder for GridHistogramEmbedder {
    fn dim(&self) -> usize {
        (self.cells * self.cells * 3 * self.bins) as usize
    }

    fn embed(&self, frame: &RgbImage, bbox: &Bbox) -> Option<Descriptor> {
        let (fw, fh) = frame.dimensions();

        let x0 = bbox.xmin.max(0.0) as u32;
        let y0 = bbox.ymin.max(0.0) as u32;
        let x1 = (bbox.xmax.min(fw as f32).max(0.0)) as u32;
        let y1 = (bbox.ymax.min(fh as f32).max(0.0)) as u32;

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let w = x1 - x0;
        let h = y1 - y0;
        let mut hist = vec![0f32; self.dim()];

        for y in y0..y1 {
            let cy = ((y - y0) * self.cells / h).min(self.cells - 1);
            for x in x0..x1 {
                let cx = ((x - x0) * self.cells / w).min(self.cells - 1);
                let cell = cy * self.cells + cx;
                let pixel = frame.get_pixel(x, y);
                for (channel, &value) in pixel.0.iter().enumerate() {
                    let bin = value as u32 * self.bins / 256;
                    let idx = ((cell * 3 + channel as u32) * self.bins + bin) as usize;
                    hist[idx] += 1.0;
                }
            }
        }

        let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm <= 0.0 {
            return None;
        }
        for v in &mut hist {
            *v /= norm;
        }

        Some(Array1::from_vec(hist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Rgb;

    fn solid_frame(w: u32, h: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(color))
    }

    #[test]
    fn test_descriptor_is_unit_norm() {
        let frame = solid_frame(64, 64, [200, 30, 30]);
        let embedder = GridHistogramEmbedder::default();
        let desc = embedder
            .embed(&frame, &Bbox::new(8.0, 8.0, 40.0, 56.0))
            .unwrap();

        assert_eq!(desc.len(), embedder.dim());
        let norm = desc.dot(&desc).sqrt();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_deterministic() {
        let frame = solid_frame(32, 32, [10, 120, 240]);
        let embedder = GridHistogramEmbedder::default();
        let bbox = Bbox::new(2.0, 2.0, 20.0, 30.0);

        let a = embedder.embed(&frame, &bbox).unwrap();
        let b = embedder.embed(&frame, &bbox).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_out_of_frame_returns_none() {
        let frame = solid_frame(32, 32, [0, 0, 0]);
        let embedder = GridHistogramEmbedder::default();

        assert!(embedder
            .embed(&frame, &Bbox::new(100.0, 100.0, 120.0, 120.0))
            .is_none());
        assert!(embedder
            .embed(&frame, &Bbox::new(-50.0, -50.0, -10.0, -10.0))
            .is_none());
    }

    #[test]
    fn test_zero_area_returns_none() {
        let frame = solid_frame(32, 32, [0, 0, 0]);
        let embedder = GridHistogramEmbedder::default();
        assert!(embedder
            .embed(&frame, &Bbox::new(5.0, 5.0, 5.0, 20.0))
            .is_none());
    }

    #[test]
    fn test_partial_crop_is_clipped() {
        let frame = solid_frame(32, 32, [50, 50, 50]);
        let embedder = GridHistogramEmbedder::default();
        // Box extends past the right/bottom edges; the in-frame part embeds.
        let desc = embedder.embed(&frame, &Bbox::new(20.0, 20.0, 60.0, 60.0));
        assert!(desc.is_some());
    }

    #[test]
    fn test_distinct_colors_are_far_apart() {
        let red = solid_frame(32, 32, [230, 20, 20]);
        let blue = solid_frame(32, 32, [20, 20, 230]);
        let embedder = GridHistogramEmbedder::default();
        let bbox = Bbox::new(0.0, 0.0, 32.0, 32.0);

        let dr = embedder.embed(&red, &bbox).unwrap();
        let db = embedder.embed(&blue, &bbox).unwrap();

        assert_abs_diff_eq!(cosine_distance(&dr, &dr), 0.0, epsilon = 1e-5);
        assert!(cosine_distance(&dr, &db) > 0.5);
    }
}
