use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use image::RgbImage;
use tracing::debug;

use boxcam_geom::PixelRect;
use boxcam_proto::report::{AnnotationReport, FrameOutcome, FrameReport, RectReport, TallyReport};
use boxcam_vision::overlay::Applied;
use boxcam_vision::pipeline::{OverlaySink, RenderBatch};
use boxcam_vision::snapshot::write_snapshot;

/// Prints a report per frame and optionally writes annotated snapshots.
pub struct ReportSink {
    json: bool,
    snapshot_dir: Option<PathBuf>,
    pixels: Arc<RgbImage>,
    written: u64,
}

impl ReportSink {
    pub fn new(json: bool, snapshot_dir: Option<PathBuf>, pixels: Arc<RgbImage>) -> Self {
        Self { json, snapshot_dir, pixels, written: 0 }
    }

    pub fn reports_written(&self) -> u64 {
        self.written
    }
}

fn rect(r: &PixelRect) -> RectReport {
    RectReport { x: r.x, y: r.y, w: r.width, h: r.height }
}

pub fn build_report(batch: &RenderBatch<'_>, ts_unix_ms: i64) -> FrameReport {
    let outcome = match batch.applied {
        Applied::Rendered(_) => FrameOutcome::Rendered,
        Applied::Cleared => FrameOutcome::Cleared,
        _ => FrameOutcome::Skipped,
    };
    let transform = batch.placement.map(|p| p.transform).unwrap_or_default();
    let annotations = batch
        .annotations
        .iter()
        .map(|a| AnnotationReport {
            label: a.label.clone(),
            confidence: a.confidence,
            frame_rect: rect(&a.rect),
            screen_rect: rect(&batch.placement.map(|p| p.to_screen(a.rect)).unwrap_or(a.rect)),
        })
        .collect();
    let tally = match (batch.tally, batch.bar) {
        (Some(t), Some(bar)) => {
            let total = (t.count_a + t.count_b) as f64;
            Some(TallyReport {
                count_a: t.count_a,
                count_b: t.count_b,
                pct_a: t.count_a as f64 / total,
                pct_b: t.count_b as f64 / total,
                bar_a: bar.a,
                bar_b: bar.b,
            })
        }
        _ => None,
    };

    FrameReport {
        ts_unix_ms,
        seq: batch.seq,
        outcome,
        orientation: batch.prediction.orientation.to_string(),
        display_w: batch.display.width,
        display_h: batch.display.height,
        scale_x: transform.scale_x,
        scale_y: transform.scale_y,
        rotation_rad: transform.rotation_radians,
        annotations,
        tally,
        error: batch.prediction.result.as_ref().err().map(|e| e.to_string()),
    }
}

impl OverlaySink for ReportSink {
    fn present(&mut self, batch: &RenderBatch<'_>) -> Result<()> {
        let ts = (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
        let report = build_report(batch, ts);

        if self.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            let labels: Vec<_> = report.annotations.iter().map(|a| a.label.as_str()).collect();
            println!(
                "frame={} outcome={:?} exif={} display={}x{} scale=({:.3},{:.3}) boxes={:?}{}",
                report.seq,
                report.outcome,
                report.orientation,
                report.display_w,
                report.display_h,
                report.scale_x,
                report.scale_y,
                labels,
                report.error.as_deref().map(|e| format!(" error={e}")).unwrap_or_default()
            );
        }
        self.written += 1;

        if let (Some(dir), Applied::Rendered(_)) = (&self.snapshot_dir, batch.applied) {
            let path = dir.join(format!("frame_{:05}.png", batch.seq));
            write_snapshot(&path, &self.pixels, batch.annotations.iter().copied())?;
            debug!("snapshot: {}", path.display());
        }
        Ok(())
    }
}
