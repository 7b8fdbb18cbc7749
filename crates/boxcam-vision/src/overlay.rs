use boxcam_geom::{map_box, place_overlay, CalibrationTable, DisplayDimensions, OverlayPlacement};
use image::Rgb;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::annotate::{Annotation, AnnotationStyle, DEFAULT_BOX_COLOR, DEFAULT_TEXT_COLOR};
use crate::predictor::Prediction;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Slots in the pool; detections past this are not shown.
    pub max_annotations: usize,
    pub box_color: [u8; 3],
    pub text_color: [u8; 3],
    pub calibration: CalibrationTable,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            max_annotations: 20,
            box_color: DEFAULT_BOX_COLOR.0,
            text_color: DEFAULT_TEXT_COLOR.0,
            calibration: CalibrationTable::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// This many slots now show the frame's detections.
    Rendered(usize),
    /// Detector returned nothing; every slot hidden.
    Cleared,
    /// Detector failed; previous annotations kept.
    Skipped,
    /// An equal or newer frame was already rendered.
    Stale,
    /// Overlay torn down; nothing changed.
    Closed,
}

/// Overlay owned by the render context: a fixed pool of annotation slots plus
/// the placement of the whole layer.
#[derive(Debug)]
pub struct Overlay {
    cfg: OverlayConfig,
    slots: Vec<Option<Annotation>>,
    placement: Option<OverlayPlacement>,
    last_seq: Option<u64>,
    closed: bool,
}

impl Overlay {
    pub fn new(cfg: OverlayConfig) -> Self {
        let slots = vec![None; cfg.max_annotations];
        Self { cfg, slots, placement: None, last_seq: None, closed: false }
    }

    pub fn apply(&mut self, prediction: &Prediction, display: DisplayDimensions) -> Applied {
        if self.closed {
            return Applied::Closed;
        }
        if self.last_seq.is_some_and(|last| prediction.seq <= last) {
            debug!(seq = prediction.seq, "stale prediction dropped");
            return Applied::Stale;
        }

        let detections = match &prediction.result {
            Ok(d) => d,
            Err(e) => {
                warn!(seq = prediction.seq, "frame skipped: {}", e);
                return Applied::Skipped;
            }
        };

        let placement = place_overlay(prediction.frame, display, prediction.orientation, &self.cfg.calibration);
        let scale = placement.transform.stroke_scale();
        let color = Rgb(self.cfg.box_color);
        let text_color = Rgb(self.cfg.text_color);

        let mut shown = detections
            .iter()
            .filter(|d| !d.label.is_empty())
            .take(self.slots.len())
            .map(|d| {
                let rect = map_box(&d.bbox.clamp01(), prediction.frame);
                Annotation {
                    rect,
                    label: d.label.clone(),
                    confidence: d.confidence,
                    color,
                    text_color,
                    style: AnnotationStyle::for_rect(&rect, scale),
                }
            });

        let mut count = 0;
        for slot in self.slots.iter_mut() {
            *slot = shown.next();
            if slot.is_some() {
                count += 1;
            }
        }

        self.placement = Some(placement);
        self.last_seq = Some(prediction.seq);
        debug!(seq = prediction.seq, count, "overlay updated");

        if count == 0 { Applied::Cleared } else { Applied::Rendered(count) }
    }

    pub fn visible(&self) -> impl Iterator<Item = &Annotation> {
        self.slots.iter().flatten()
    }

    pub fn placement(&self) -> Option<&OverlayPlacement> {
        self.placement.as_ref()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn hide_all(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    /// Tear down. Later results are ignored.
    pub fn shutdown(&mut self) {
        self.hide_all();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
