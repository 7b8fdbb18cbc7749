pub mod annotate;
pub mod camera;
pub mod overlay;
pub mod pipeline;
pub mod predictor;
pub mod replay;
pub mod snapshot;

use std::sync::Arc;

use boxcam_geom::{DisplayDimensions, ExifOrientation, FrameDimensions, InterfaceOrientation, NormalizedBox};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    // normalized 0..1, origin bottom-left
    pub bbox: NormalizedBox,
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: NormalizedBox, label: impl Into<String>, confidence: f32) -> Self {
        Self { bbox, label: label.into(), confidence }
    }
}

/// Every variant costs one frame; none is fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectError {
    #[error("detector failed to load: {0}")]
    ModelUnavailable(String),
    #[error("detection request failed: {0}")]
    Request(String),
    #[error("unexpected detector output: {0}")]
    MalformedResult(String),
    #[error("inference worker failed: {0}")]
    Worker(String),
}

/// One captured camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub seq: u64,
    pub pixels: Arc<RgbImage>,
    pub dimensions: FrameDimensions,
    /// Interface orientation at capture time.
    pub interface: InterfaceOrientation,
    /// Display size at capture time, taken together with `interface`.
    pub display: Option<DisplayDimensions>,
}

impl Frame {
    pub fn new(seq: u64, pixels: Arc<RgbImage>, interface: InterfaceOrientation) -> Self {
        let dimensions = FrameDimensions::new(pixels.width(), pixels.height());
        Self { seq, pixels, dimensions, interface, display: None }
    }

    pub fn with_display(mut self, display: DisplayDimensions) -> Self {
        self.display = Some(display);
        self
    }
}

/// Opaque model: oriented pixel buffer in, normalized detections out.
pub trait Detector: Send {
    fn name(&self) -> &'static str;

    fn infer(&mut self, frame: &Frame, orientation: ExifOrientation) -> Result<Vec<Detection>, DetectError>;
}
