use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use boxcam_geom::{ExifOrientation, InterfaceOrientation, NormalizedBox};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{DetectError, Detection, Detector, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptedFailure {
    ModelUnavailable,
    Request,
    Malformed,
}

impl ScriptedFailure {
    fn to_error(self, seq: u64) -> DetectError {
        match self {
            Self::ModelUnavailable => DetectError::ModelUnavailable("model not loaded".into()),
            Self::Request => DetectError::Request(format!("scripted request failure at frame {seq}")),
            Self::Malformed => DetectError::MalformedResult("observations of unexpected type".into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedDetection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl From<&ScriptedDetection> for Detection {
    fn from(d: &ScriptedDetection) -> Self {
        Detection::new(NormalizedBox::new(d.x, d.y, d.width, d.height), d.label.clone(), d.confidence)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedFrame {
    #[serde(default = "default_interface")]
    pub interface: InterfaceOrientation,
    /// Pause before this frame is delivered.
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub fail: Option<ScriptedFailure>,
    #[serde(default)]
    pub detections: Vec<ScriptedDetection>,
}

fn default_interface() -> InterfaceOrientation {
    InterfaceOrientation::Portrait
}

/// A recorded or hand-written capture session: per-frame orientation and the
/// detector output to play back for it.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    #[serde(default = "default_true")]
    pub model_loaded: bool,
    /// Simulated inference time.
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub frames: Vec<ScriptedFrame>,
}

fn default_true() -> bool {
    true
}

impl Session {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).with_context(|| format!("read session {}", path.display()))?;
        Self::from_toml_str(&s).with_context(|| format!("parse session {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let session: Session = toml::from_str(s)?;
        anyhow::ensure!(!session.frames.is_empty(), "session has no frames");
        Ok(session)
    }
}

/// Plays a session's scripted output back, keyed by frame sequence number.
pub struct ScriptedDetector {
    model_loaded: bool,
    latency: Duration,
    frames: HashMap<u64, ScriptedFrame>,
}

impl ScriptedDetector {
    pub fn from_session(session: &Session) -> Self {
        let frames = session
            .frames
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, f)| (i as u64, f))
            .collect();
        info!(frames = session.frames.len(), "vision: scripted detector ready");
        Self {
            model_loaded: session.model_loaded,
            latency: Duration::from_millis(session.latency_ms),
            frames,
        }
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn infer(&mut self, frame: &Frame, orientation: ExifOrientation) -> Result<Vec<Detection>, DetectError> {
        if !self.model_loaded {
            return Err(ScriptedFailure::ModelUnavailable.to_error(frame.seq));
        }
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        let Some(script) = self.frames.get(&frame.seq) else {
            debug!(seq = frame.seq, "no script for frame");
            return Ok(Vec::new());
        };
        if let Some(fail) = script.fail {
            return Err(fail.to_error(frame.seq));
        }
        debug!(seq = frame.seq, %orientation, n = script.detections.len(), "scripted detections");
        Ok(script.detections.iter().map(Detection::from).collect())
    }
}
