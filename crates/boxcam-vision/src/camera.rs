use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use boxcam_geom::{scale_axes, DisplayDimensions, FrameDimensions, InterfaceOrientation, ScaleAxes};
use image::{imageops::FilterType, RgbImage};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::replay::{ScriptedFrame, Session};
use crate::Frame;

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Still image used as the pixel buffer for every frame (resized to width x height).
    #[serde(default)]
    pub still_path: Option<String>,
}

fn default_fps() -> u32 {
    30
}

impl CameraConfig {
    pub fn dimensions(&self) -> FrameDimensions {
        FrameDimensions::new(self.width, self.height)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }

    /// Pixel buffer at the native capture resolution.
    pub fn load_pixels(&self) -> Result<RgbImage> {
        match &self.still_path {
            Some(path) => {
                let img = image::open(path).with_context(|| format!("open still image {}", path))?;
                let rgb = img.to_rgb8();
                if rgb.dimensions() == (self.width, self.height) {
                    Ok(rgb)
                } else {
                    debug!("camera: resizing still {}x{} -> {}x{}", rgb.width(), rgb.height(), self.width, self.height);
                    Ok(image::imageops::resize(&rgb, self.width, self.height, FilterType::Triangle))
                }
            }
            None => Ok(RgbImage::new(self.width, self.height)),
        }
    }
}

/// Camera side of the pipeline: yields frames until the session ends.
pub trait FrameSource {
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Frame>>> + Send;
}

/// Display size for an interface orientation: portrait puts the long side
/// vertical, landscape horizontal.
pub fn oriented_display(base: DisplayDimensions, interface: InterfaceOrientation) -> DisplayDimensions {
    let long = base.width.max(base.height);
    let short = base.width.min(base.height);
    match scale_axes(interface) {
        ScaleAxes::Swap => DisplayDimensions::new(short, long),
        ScaleAxes::Keep => DisplayDimensions::new(long, short),
    }
}

/// Replays a scripted session as a camera. When given a display channel it
/// also emits rotation events as the scripted orientation changes.
pub struct ReplaySource {
    pixels: Arc<RgbImage>,
    frames: std::vec::IntoIter<ScriptedFrame>,
    default_interval: Duration,
    next_seq: u64,
    display: Option<(watch::Sender<DisplayDimensions>, DisplayDimensions)>,
}

impl ReplaySource {
    pub fn new(cfg: &CameraConfig, session: &Session) -> Result<Self> {
        let pixels = Arc::new(cfg.load_pixels()?);
        info!(
            "camera: replay {} frames at {}x{} @ {}fps",
            session.frames.len(),
            cfg.width,
            cfg.height,
            cfg.fps
        );
        Ok(Self {
            pixels,
            frames: session.frames.clone().into_iter(),
            default_interval: cfg.frame_interval(),
            next_seq: 0,
            display: None,
        })
    }

    pub fn pixels(&self) -> Arc<RgbImage> {
        self.pixels.clone()
    }

    /// Drive `tx` with the base display rotated to each frame's orientation.
    pub fn with_display(mut self, tx: watch::Sender<DisplayDimensions>, base: DisplayDimensions) -> Self {
        self.display = Some((tx, base));
        self
    }
}

impl FrameSource for ReplaySource {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(script) = self.frames.next() else {
            return Ok(None);
        };
        let interval = script.interval_ms.map(Duration::from_millis).unwrap_or(self.default_interval);
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let frame = Frame::new(seq, self.pixels.clone(), script.interface);

        let Some((tx, base)) = &self.display else {
            return Ok(Some(frame));
        };
        let next = oriented_display(*base, script.interface);
        tx.send_if_modified(|current| {
            if *current != next {
                debug!("camera: display rotated to {}x{}", next.width, next.height);
                *current = next;
                true
            } else {
                false
            }
        });
        Ok(Some(frame.with_display(next)))
    }
}
