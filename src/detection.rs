//! Per-frame detection input

use crate::bbox::Bbox;
use crate::embedder::Descriptor;

/// A single detector output for the current frame. Detections are consumed
/// by one tracker update and not retained across frames.
#[derive(Debug, Clone)]
pub struct Detection {
    bbox: Bbox,
    confidence: f32,
    class_label: String,
    feature: Option<Descriptor>,
}

impl Detection {
    /// Build from the detector's (left, top, width, height) box convention.
    pub fn new(
        ltwh: [f32; 4],
        confidence: f32,
        class_label: impl Into<String>,
    ) -> Self {
        Self {
            bbox: Bbox::from_ltwh(ltwh[0], ltwh[1], ltwh[2], ltwh[3]),
            confidence,
            class_label: class_label.into(),
            feature: None,
        }
    }

    pub fn bbox(&self) -> &Bbox {
        &self.bbox
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn class_label(&self) -> &str {
        &self.class_label
    }

    pub fn feature(&self) -> Option<&Descriptor> {
        self.feature.as_ref()
    }

    /// Attach an appearance descriptor computed from the frame crop.
    pub fn set_feature(&mut self, feature: Option<Descriptor>) {
        self.feature = feature;
    }

    /// True if the box has positive extent and the confidence is a
    /// plausible probability. Anything else is dropped before matching.
    pub fn is_well_formed(&self) -> bool {
        self.bbox.is_valid() && (0.0..=1.0).contains(&self.confidence)
    }
}
