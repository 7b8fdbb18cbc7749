//! Geometry for placing detection overlays on a camera preview: orientation
//! tags, box mapping, the shared overlay transform, and the up/down tally.

pub mod coords;
pub mod doctor;
pub mod orientation;
pub mod tally;

pub use coords::{
    compute_overlay_transform, map_box, map_box_fit_width, place_overlay, Calibration,
    CalibrationTable, DisplayDimensions, FrameDimensions, NormalizedBox, OverlayPlacement,
    OverlayTransform, PixelRect, Point,
};
pub use orientation::{resolve, scale_axes, ExifOrientation, InterfaceOrientation, OrientationError, ScaleAxes};
pub use tally::{Tally, TallyState};
