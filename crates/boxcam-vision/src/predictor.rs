use std::sync::{Arc, Mutex};

use boxcam_geom::{resolve, DisplayDimensions, ExifOrientation, FrameDimensions, InterfaceOrientation};
use serde::Deserialize;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{DetectError, Detection, Detector, Frame};

/// What to do with a frame that arrives while an inference is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GatePolicy {
    /// Hold the camera context until the slot frees up.
    #[default]
    Block,
    /// Skip the frame.
    DropWhileBusy,
}

/// Result of one inference, tagged with the frame it describes.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub seq: u64,
    pub frame: FrameDimensions,
    pub interface: InterfaceOrientation,
    pub orientation: ExifOrientation,
    /// Display size the frame was captured against.
    pub display: Option<DisplayDimensions>,
    pub result: Result<Vec<Detection>, DetectError>,
}

/// Runs the detector with at most one inference in flight.
///
/// The single permit is held from submission until the result has been handed
/// to the render channel, so results reach the renderer in capture order.
pub struct Predictor<D> {
    name: &'static str,
    detector: Arc<Mutex<D>>,
    gate: Arc<Semaphore>,
    policy: GatePolicy,
}

impl<D: Detector + 'static> Predictor<D> {
    pub fn new(detector: D, policy: GatePolicy) -> Self {
        Self {
            name: detector.name(),
            detector: Arc::new(Mutex::new(detector)),
            gate: Arc::new(Semaphore::new(1)),
            policy,
        }
    }

    pub fn detector_name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn in_flight(&self) -> bool {
        self.gate.available_permits() == 0
    }

    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match self.policy {
            GatePolicy::Block => self.gate.clone().acquire_owned().await.ok(),
            GatePolicy::DropWhileBusy => self.gate.clone().try_acquire_owned().ok(),
        }
    }

    /// Run one inference and wait for it. `None` when the gate dropped the frame.
    pub async fn predict(&self, frame: Frame) -> Option<Prediction> {
        let _permit = self.acquire().await?;
        Some(infer(self.detector.clone(), frame).await)
    }

    /// Start an inference whose result is sent on `tx`. Returns `None` when the
    /// gate dropped the frame. The permit is released after delivery.
    pub async fn submit(&self, frame: Frame, tx: mpsc::Sender<Prediction>) -> Option<JoinHandle<()>> {
        let seq = frame.seq;
        let Some(permit) = self.acquire().await else {
            debug!(seq, "predictor busy, frame dropped");
            return None;
        };
        let detector = self.detector.clone();
        Some(tokio::spawn(async move {
            let prediction = infer(detector, frame).await;
            if tx.send(prediction).await.is_err() {
                debug!(seq, "render context gone, result discarded");
            }
            drop(permit);
        }))
    }

    /// Wait for any in-flight inference to be delivered.
    pub async fn drain(&self) {
        let _ = self.gate.acquire().await;
    }
}

async fn infer<D: Detector + 'static>(detector: Arc<Mutex<D>>, frame: Frame) -> Prediction {
    let seq = frame.seq;
    let dims = frame.dimensions;
    let interface = frame.interface;
    let display = frame.display;
    let orientation = resolve(interface);

    let joined = tokio::task::spawn_blocking(move || {
        let mut guard = detector
            .lock()
            .map_err(|_| DetectError::Worker("detector lock poisoned".into()))?;
        guard.infer(&frame, orientation)
    })
    .await;

    let result = match joined {
        Ok(r) => r,
        Err(e) => Err(DetectError::Worker(e.to_string())),
    };
    if let Err(e) = &result {
        warn!(seq, "inference failed: {}", e);
    }

    Prediction { seq, frame: dims, interface, orientation, display, result }
}
