use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Annotations replaced with this frame's detections.
    Rendered,
    /// Detector succeeded with nothing to show; all slots hidden.
    Cleared,
    /// Detector failed; previous annotations left on screen.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectReport {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationReport {
    pub label: String,
    pub confidence: f32,
    // frame pixels, top-left origin
    pub frame_rect: RectReport,
    // display coordinates after the overlay transform
    pub screen_rect: RectReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TallyReport {
    pub count_a: u64,
    pub count_b: u64,
    pub pct_a: f64,
    pub pct_b: f64,
    pub bar_a: f64,
    pub bar_b: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub ts_unix_ms: i64,
    pub seq: u64,
    pub outcome: FrameOutcome,
    pub orientation: String,
    pub display_w: f64,
    pub display_h: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation_rad: f64,
    pub annotations: Vec<AnnotationReport>,
    pub tally: Option<TallyReport>,
    pub error: Option<String>,
}
