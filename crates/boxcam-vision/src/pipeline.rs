use std::fmt;

use anyhow::Result;
use boxcam_geom::{DisplayDimensions, OverlayPlacement, Tally, TallyState};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::annotate::Annotation;
use crate::camera::FrameSource;
use crate::overlay::{Applied, Overlay, OverlayConfig};
use crate::predictor::{Prediction, Predictor};
use crate::Detector;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub enable: bool,
    pub label_a: String,
    pub label_b: String,
    /// Width of the two-segment bar, in display points.
    pub bar_width: f64,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self { enable: false, label_a: "up".into(), label_b: "down".into(), bar_width: 300.0 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    pub overlay: OverlayConfig,
    pub tally: TallyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarWidths {
    pub a: f64,
    pub b: f64,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct RenderBatch<'a> {
    pub seq: u64,
    pub applied: Applied,
    pub prediction: &'a Prediction,
    pub display: DisplayDimensions,
    pub placement: Option<&'a OverlayPlacement>,
    pub annotations: Vec<&'a Annotation>,
    pub tally: Option<TallyState>,
    pub bar: Option<BarWidths>,
}

/// Presentation layer. Called on the render context only.
pub trait OverlaySink: Send {
    fn present(&mut self, batch: &RenderBatch<'_>) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub frames_captured: u64,
    pub frames_dropped: u64,
    pub rendered: u64,
    pub cleared: u64,
    pub skipped: u64,
    pub stale: u64,
    pub tally: Option<TallyState>,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "captured={} dropped={} rendered={} cleared={} skipped={} stale={}",
            self.frames_captured, self.frames_dropped, self.rendered, self.cleared, self.skipped, self.stale
        )
    }
}

struct RenderContext<K> {
    overlay: Overlay,
    tally: Option<Tally>,
    bar_width: f64,
    display: watch::Receiver<DisplayDimensions>,
    sink: K,
    summary: SessionSummary,
}

impl<K: OverlaySink> RenderContext<K> {
    fn new(cfg: RenderConfig, display: watch::Receiver<DisplayDimensions>, sink: K) -> Self {
        let tally = cfg
            .tally
            .enable
            .then(|| Tally::with_labels(cfg.tally.label_a.clone(), cfg.tally.label_b.clone()));
        Self {
            overlay: Overlay::new(cfg.overlay),
            tally,
            bar_width: cfg.tally.bar_width,
            display,
            sink,
            summary: SessionSummary::default(),
        }
    }

    fn handle(&mut self, prediction: Prediction) {
        let display = prediction.display.unwrap_or_else(|| *self.display.borrow());
        let applied = self.overlay.apply(&prediction, display);

        match applied {
            Applied::Rendered(_) => self.summary.rendered += 1,
            Applied::Cleared => self.summary.cleared += 1,
            Applied::Skipped => self.summary.skipped += 1,
            Applied::Stale => self.summary.stale += 1,
            Applied::Closed => return,
        }

        if let (Applied::Rendered(_) | Applied::Cleared, Some(tally), Ok(dets)) =
            (applied, self.tally.as_mut(), &prediction.result)
        {
            for d in dets {
                tally.observe(&d.label);
            }
        }

        if applied == Applied::Stale {
            return;
        }

        let bar = self.tally.as_ref().map(|t| {
            let (a, b) = t.bar_widths(self.bar_width);
            BarWidths { a, b }
        });
        let batch = RenderBatch {
            seq: prediction.seq,
            applied,
            prediction: &prediction,
            display,
            placement: self.overlay.placement(),
            annotations: self.overlay.visible().collect(),
            tally: self.tally.as_ref().map(Tally::state),
            bar,
        };
        if let Err(e) = self.sink.present(&batch) {
            warn!(seq = prediction.seq, "render failed: {:#}", e);
        }
    }

    fn finish(mut self) -> (SessionSummary, K) {
        self.overlay.shutdown();
        if let Some(t) = &self.tally {
            let (a, b) = t.labels();
            let s = t.state();
            info!("tally: {}={} {}={}", a, s.count_a, b, s.count_b);
        }
        self.summary.tally = self.tally.as_ref().map(Tally::state);
        (self.summary, self.sink)
    }
}

async fn render_loop<K: OverlaySink>(mut ctx: RenderContext<K>, mut rx: mpsc::Receiver<Prediction>) -> (SessionSummary, K) {
    while let Some(prediction) = rx.recv().await {
        ctx.handle(prediction);
    }
    ctx.finish()
}

/// Run a capture session to completion: camera loop on the caller, inference
/// behind the predictor gate, rendering on its own task. Returns the summary
/// and the sink.
pub async fn run<S, D, K>(
    mut source: S,
    predictor: Predictor<D>,
    cfg: RenderConfig,
    display: watch::Receiver<DisplayDimensions>,
    sink: K,
) -> Result<(SessionSummary, K)>
where
    S: FrameSource,
    D: Detector + 'static,
    K: OverlaySink + 'static,
{
    info!("session start: detector={} gate={:?}", predictor.detector_name(), predictor.policy());
    let capture_display = display.clone();
    let (tx, rx) = mpsc::channel::<Prediction>(4);
    let render = tokio::spawn(render_loop(RenderContext::new(cfg, display, sink), rx));

    let mut captured = 0u64;
    let mut dropped = 0u64;
    while let Some(frame) = source.next_frame().await? {
        captured += 1;
        let frame = if frame.display.is_some() {
            frame
        } else {
            frame.with_display(*capture_display.borrow())
        };
        if predictor.submit(frame, tx.clone()).await.is_none() {
            dropped += 1;
        }
    }
    // Remaining senders live in in-flight tasks; the render loop ends after them.
    drop(tx);
    predictor.drain().await;

    let (mut summary, sink) = render.await?;
    summary.frames_captured = captured;
    summary.frames_dropped = dropped;
    info!("session done: {}", summary);
    Ok((summary, sink))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_lists_every_counter() {
        let summary = SessionSummary {
            frames_captured: 6,
            frames_dropped: 1,
            rendered: 2,
            cleared: 1,
            skipped: 1,
            stale: 1,
            tally: None,
        };
        assert_eq!(summary.to_string(), "captured=6 dropped=1 rendered=2 cleared=1 skipped=1 stale=1");
    }
}
