//! Appearance-aware multi-object tracking
//!
//! This crate assigns stable identities to moving targets across a video
//! stream from per-frame bounding-box detections alone. Each frame, a
//! constant-velocity Kalman filter predicts every known target forward,
//! detections are embedded into appearance descriptors, a blended
//! motion/appearance cost matrix is solved with minimum-cost assignment,
//! and a cascaded matcher plus lifecycle manager births, confirms, ages and
//! deletes tracks.
//!
//! Detection and video decode stay outside the crate: feed in boxes from any
//! detector, get back confirmed track identities.
//!
//! ```rust,ignore
//! use reidtrack::{Detection, Tracker, TrackerConfig};
//!
//! let mut tracker = Tracker::new(TrackerConfig::default());
//!
//! // per frame: detections for the tracked class, confidence pre-filtered
//! let detections = vec![Detection::new([32.0, 40.0, 64.0, 128.0], 0.87, "player")];
//! for track in tracker.update(&frame, detections) {
//!     println!("#{} {:?}", track.track_id, track.ltrb);
//! }
//! ```

pub mod bbox;
pub mod config;
pub mod cost;
pub mod detection;
pub mod embedder;
pub mod hungarian;
pub mod kalman;
pub mod track;
pub mod tracker;

pub use bbox::Bbox;
pub use config::TrackerConfig;
pub use detection::Detection;
pub use embedder::{Descriptor, Embedder, GridHistogramEmbedder};
pub use hungarian::AssignmentResult;
pub use track::{Track, TrackState};
pub use tracker::{TrackOutput, Tracker};
