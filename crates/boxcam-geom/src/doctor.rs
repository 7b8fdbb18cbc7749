use anyhow::Result;
use crate::coords::{Calibration, CalibrationTable, DisplayDimensions, FrameDimensions};

pub fn check_dimensions(frame: FrameDimensions, display: DisplayDimensions) -> Result<()> {
    anyhow::ensure!(!frame.is_degenerate(), "camera.width/height must be > 0 (got {}x{})", frame.width, frame.height);
    anyhow::ensure!(frame.width <= 16_384 && frame.height <= 16_384, "camera resolution implausibly large");
    anyhow::ensure!(
        display.width.is_finite() && display.height.is_finite() && !display.is_degenerate(),
        "display.width/height must be finite and > 0"
    );
    Ok(())
}

pub fn check_calibration(table: &CalibrationTable) -> Result<()> {
    for (family, cal) in [("rotated", table.rotated), ("upright", table.upright)] {
        if let Calibration::Fixed { x, y } = cal {
            anyhow::ensure!(
                x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0,
                "overlay.calibration.{family}: fixed scale must be finite and > 0 (got x={x}, y={y})"
            );
        }
    }
    Ok(())
}
