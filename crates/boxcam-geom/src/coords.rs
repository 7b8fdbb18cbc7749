use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::orientation::ExifOrientation;

/// Detector output: [0,1] coordinates, origin bottom-left, y up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Pull a box back into the unit square. NaN components collapse to 0.
    pub fn clamp01(self) -> Self {
        let unit = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        let x = unit(self.x);
        let y = unit(self.y);
        Self {
            x,
            y,
            width: unit(self.width).min(1.0 - x),
            height: unit(self.height).min(1.0 - y),
        }
    }
}

/// Native capture resolution of the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Size of the rendering surface. Changes when the device rotates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayDimensions {
    pub width: f64,
    pub height: f64,
}

impl DisplayDimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn center(&self) -> Point {
        Point { x: self.width / 2.0, y: self.height / 2.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned rectangle, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point { x: self.x + self.width / 2.0, y: self.y + self.height / 2.0 }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    fn corners(&self) -> [Point; 4] {
        [
            Point { x: self.x, y: self.y },
            Point { x: self.max_x(), y: self.y },
            Point { x: self.x, y: self.max_y() },
            Point { x: self.max_x(), y: self.max_y() },
        ]
    }

    fn bounding(points: &[Point]) -> Self {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Self { x: min_x, y: min_y, width: max_x - min_x, height: max_y - min_y }
    }
}

/// One transform for the whole overlay layer of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation_radians: f64,
}

impl OverlayTransform {
    pub const IDENTITY: OverlayTransform = OverlayTransform {
        scale_x: 1.0,
        scale_y: 1.0,
        rotation_radians: 0.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Magnitude used to keep stroke widths and fonts constant on screen.
    pub fn stroke_scale(&self) -> f64 {
        let s = self.scale_x.abs().max(self.scale_y.abs());
        if s.is_finite() && s > 0.0 { s } else { 1.0 }
    }

    fn apply(&self, v: Point) -> Point {
        let (sin, cos) = self.rotation_radians.sin_cos();
        let x = v.x * self.scale_x;
        let y = v.y * self.scale_y;
        Point { x: x * cos - y * sin, y: x * sin + y * cos }
    }
}

impl Default for OverlayTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Scale policy for one orientation family. Empirical calibration data, not a
/// derived law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Calibration {
    /// Aspect-fill: one scale, large side against large side.
    Isotropic,
    /// Per-axis display/frame ratio, matching a preview that stretches to the view.
    Stretch,
    /// Hand-tuned pair.
    Fixed { x: f64, y: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationTable {
    /// Left/right tag family (device held so capture width maps to display height).
    pub rotated: Calibration,
    /// Top/bottom tag family.
    pub upright: Calibration,
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self { rotated: Calibration::Stretch, upright: Calibration::Isotropic }
    }
}

impl CalibrationTable {
    pub fn for_orientation(&self, orientation: ExifOrientation) -> Calibration {
        if orientation.swaps_axes() { self.rotated } else { self.upright }
    }
}

/// Where the overlay layer sits on the display and how it is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPlacement {
    /// Layer bounds in frame pixels.
    pub bounds: PixelRect,
    /// Layer centre in display coordinates.
    pub position: Point,
    pub transform: OverlayTransform,
}

impl OverlayPlacement {
    /// Project a frame-space rect onto the display.
    pub fn to_screen(&self, rect: PixelRect) -> PixelRect {
        let anchor = self.bounds.center();
        let corners = rect.corners().map(|c| {
            let v = self.transform.apply(Point { x: c.x - anchor.x, y: c.y - anchor.y });
            Point { x: self.position.x + v.x, y: self.position.y + v.y }
        });
        PixelRect::bounding(&corners)
    }
}

/// Normalized (bottom-left) box to frame pixels (top-left). The vertical flip
/// happens here, before any display scaling.
pub fn map_box(b: &NormalizedBox, frame: FrameDimensions) -> PixelRect {
    let fw = frame.width as f64;
    let fh = frame.height as f64;
    PixelRect {
        x: b.x * fw,
        y: fh - (b.y + b.height) * fh,
        width: b.width * fw,
        height: b.height * fh,
    }
}

/// Aspect-fill scale covering `display` with `frame`, comparing the long side
/// to the long side so rotation never swaps the pairing.
pub fn aspect_fill_scale(frame: FrameDimensions, display: DisplayDimensions) -> f64 {
    let real_width_display = display.width.max(display.height);
    let real_height_display = display.width.min(display.height);
    let real_width_frame = frame.width.max(frame.height) as f64;
    let real_height_frame = frame.width.min(frame.height) as f64;

    let scale = (real_width_display / real_width_frame).max(real_height_display / real_height_frame);
    if scale.is_finite() { scale } else { 1.0 }
}

fn finite_or_one(v: f64) -> f64 {
    if v.is_finite() { v } else { 1.0 }
}

fn stretch_pair(frame: FrameDimensions, display: DisplayDimensions) -> (f64, f64) {
    (
        finite_or_one(display.width / frame.width as f64),
        finite_or_one(display.height / frame.height as f64),
    )
}

pub fn compute_overlay_transform(
    frame: FrameDimensions,
    display: DisplayDimensions,
    orientation: ExifOrientation,
    calibration: &CalibrationTable,
) -> OverlayTransform {
    if frame.is_degenerate() || display.is_degenerate() {
        return OverlayTransform::IDENTITY;
    }

    let (sx, sy) = match calibration.for_orientation(orientation) {
        Calibration::Isotropic => {
            let s = aspect_fill_scale(frame, display);
            (s, s)
        }
        Calibration::Stretch => stretch_pair(frame, display),
        Calibration::Fixed { x, y } => (finite_or_one(x), finite_or_one(y)),
    };
    debug!(%orientation, sx, sy, "overlay transform");

    // The capture is mirrored against the display on both axes.
    OverlayTransform { scale_x: -sx, scale_y: -sy, rotation_radians: 0.0 }
}

pub fn place_overlay(
    frame: FrameDimensions,
    display: DisplayDimensions,
    orientation: ExifOrientation,
    calibration: &CalibrationTable,
) -> OverlayPlacement {
    OverlayPlacement {
        bounds: PixelRect::new(0.0, 0.0, frame.width as f64, frame.height as f64),
        position: display.center(),
        transform: compute_overlay_transform(frame, display, orientation, calibration),
    }
}

/// Fit-width mapping: the video spans the screen width, keeps its aspect ratio
/// (portrait capture, so height = width * video.width / video.height) and is
/// centred vertically. Returns a screen-space rect directly.
pub fn map_box_fit_width(b: &NormalizedBox, video: FrameDimensions, screen: DisplayDimensions) -> PixelRect {
    if video.is_degenerate() || screen.is_degenerate() {
        return PixelRect::default();
    }
    let width = screen.width;
    let height = width * (video.width as f64 / video.height as f64);
    let offset_y = (screen.height - height) / 2.0;

    PixelRect {
        x: b.x * width,
        y: height + offset_y - (b.y + b.height) * height,
        width: b.width * width,
        height: b.height * height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn bottom_edge_boxes_flip_to_top_rows_only_at_full_height() {
        let frame = FrameDimensions::new(640, 480);
        for h in [0.0, 0.1, 0.25, 0.5, 0.99, 1.0] {
            let r = map_box(&NormalizedBox::new(0.3, 0.0, 0.2, h), frame);
            assert!((r.y - 480.0 * (1.0 - h)).abs() < EPS, "h={h}");
        }
        let full = map_box(&NormalizedBox::new(0.0, 0.0, 1.0, 1.0), frame);
        assert_eq!(full, PixelRect::new(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn maps_reference_box() {
        let r = map_box(&NormalizedBox::new(0.1, 0.1, 0.2, 0.2), FrameDimensions::new(640, 480));
        assert!(approx(r.x, 64.0));
        assert!(approx(r.y, 336.0));
        assert!(approx(r.width, 128.0));
        assert!(approx(r.height, 96.0));
    }

    #[test]
    fn transform_is_pure() {
        let frame = FrameDimensions::new(1920, 1080);
        let display = DisplayDimensions::new(390.0, 844.0);
        let table = CalibrationTable::default();
        for o in ExifOrientation::ALL {
            let a = compute_overlay_transform(frame, display, o, &table);
            let b = compute_overlay_transform(frame, display, o, &table);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn zero_dimensions_give_identity() {
        let table = CalibrationTable::default();
        let cases = [
            (FrameDimensions::new(0, 0), DisplayDimensions::new(390.0, 844.0)),
            (FrameDimensions::new(640, 0), DisplayDimensions::new(390.0, 844.0)),
            (FrameDimensions::new(0, 480), DisplayDimensions::new(390.0, 844.0)),
            (FrameDimensions::new(640, 480), DisplayDimensions::new(0.0, 844.0)),
            (FrameDimensions::new(640, 480), DisplayDimensions::new(390.0, 0.0)),
            (FrameDimensions::new(640, 480), DisplayDimensions::new(0.0, 0.0)),
        ];
        for (frame, display) in cases {
            for o in ExifOrientation::ALL {
                let t = compute_overlay_transform(frame, display, o, &table);
                assert!(t.is_identity(), "{frame:?} {display:?} {o}");
            }
        }
    }

    #[test]
    fn degenerate_fill_scale_falls_back_to_one() {
        assert_eq!(aspect_fill_scale(FrameDimensions::new(0, 0), DisplayDimensions::new(100.0, 100.0)), 1.0);
    }

    #[test]
    fn upright_family_uses_mirrored_aspect_fill() {
        let frame = FrameDimensions::new(640, 480);
        let display = DisplayDimensions::new(1170.0, 2532.0);
        let t = compute_overlay_transform(frame, display, ExifOrientation::TopLeft, &CalibrationTable::default());
        let expected = (2532.0_f64 / 640.0).max(1170.0 / 480.0);
        assert!(approx(t.scale_x, -expected));
        assert!(approx(t.scale_y, -expected));
        assert_eq!(t.rotation_radians, 0.0);
        assert!(approx(expected, 3.95625));
    }

    #[test]
    fn rotated_family_uses_calibration_pair() {
        let frame = FrameDimensions::new(640, 480);
        let display = DisplayDimensions::new(1170.0, 2532.0);
        let table = CalibrationTable {
            rotated: Calibration::Fixed { x: 1.83, y: 5.27 },
            ..Default::default()
        };
        let t = compute_overlay_transform(frame, display, ExifOrientation::RightTop, &table);
        assert_eq!(t, OverlayTransform { scale_x: -1.83, scale_y: -5.27, rotation_radians: 0.0 });

        let stretched = compute_overlay_transform(frame, display, ExifOrientation::RightTop, &CalibrationTable::default());
        assert!(approx(stretched.scale_x, -1170.0 / 640.0));
        assert!(approx(stretched.scale_y, -2532.0 / 480.0));

        let iso = CalibrationTable { rotated: Calibration::Isotropic, ..Default::default() };
        let t = compute_overlay_transform(frame, display, ExifOrientation::LeftBottom, &iso);
        assert!(approx(t.scale_x, -3.95625));
    }

    #[test]
    fn placement_centres_layer_on_display() {
        let frame = FrameDimensions::new(640, 480);
        let display = DisplayDimensions::new(1170.0, 2532.0);
        let p = place_overlay(frame, display, ExifOrientation::TopLeft, &CalibrationTable::default());
        assert_eq!(p.bounds, PixelRect::new(0.0, 0.0, 640.0, 480.0));
        assert_eq!(p.position, Point { x: 585.0, y: 1266.0 });

        // Layer centre lands on display centre; the mirror sends the
        // top-left corner towards the bottom-right.
        let s = 3.95625;
        let r = p.to_screen(PixelRect::new(0.0, 0.0, 64.0, 48.0));
        assert!(approx(r.width, 64.0 * s));
        assert!(approx(r.height, 48.0 * s));
        assert!(approx(r.max_x(), 585.0 + 320.0 * s));
        assert!(approx(r.max_y(), 1266.0 + 240.0 * s));

        let centre = p.to_screen(PixelRect::new(320.0, 240.0, 0.0, 0.0));
        assert!(approx(centre.x, 585.0) && approx(centre.y, 1266.0));
    }

    #[test]
    fn identity_placement_is_a_translation() {
        let frame = FrameDimensions::new(0, 0);
        let p = place_overlay(frame, DisplayDimensions::new(100.0, 200.0), ExifOrientation::RightTop, &CalibrationTable::default());
        let r = p.to_screen(PixelRect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(r, PixelRect::new(51.0, 102.0, 3.0, 4.0));
    }

    #[test]
    fn fit_width_centres_video_vertically() {
        let video = FrameDimensions::new(1920, 1080);
        let screen = DisplayDimensions::new(375.0, 812.0);
        let height = 375.0 * 1920.0 / 1080.0;
        let offset = (812.0 - height) / 2.0;

        let r = map_box_fit_width(&NormalizedBox::new(0.0, 0.0, 1.0, 1.0), video, screen);
        assert!(approx(r.x, 0.0));
        assert!(approx(r.y, offset));
        assert!(approx(r.width, 375.0));
        assert!(approx(r.height, height));

        let low = map_box_fit_width(&NormalizedBox::new(0.5, 0.0, 0.1, 0.1), video, screen);
        assert!(approx(low.max_y(), height + offset));

        assert_eq!(
            map_box_fit_width(&NormalizedBox::new(0.5, 0.5, 0.1, 0.1), FrameDimensions::new(0, 0), screen),
            PixelRect::default()
        );
    }

    #[test]
    fn clamp_keeps_box_inside_unit_square() {
        let b = NormalizedBox::new(0.9, -0.2, 0.5, 2.0).clamp01();
        assert_eq!(b.x, 0.9);
        assert_eq!(b.y, 0.0);
        assert!(approx(b.width, 0.1));
        assert_eq!(b.height, 1.0);

        let nan = NormalizedBox::new(f64::NAN, 0.5, f64::INFINITY, f64::NAN).clamp01();
        assert_eq!(nan, NormalizedBox::new(0.0, 0.5, 1.0, 0.0));
    }

    #[test]
    fn non_finite_fixed_pair_never_reaches_transform() {
        let frame = FrameDimensions::new(640, 480);
        let display = DisplayDimensions::new(1170.0, 2532.0);
        let table = CalibrationTable {
            rotated: Calibration::Fixed { x: f64::NAN, y: f64::INFINITY },
            ..Default::default()
        };
        let t = compute_overlay_transform(frame, display, ExifOrientation::RightTop, &table);
        assert_eq!(t, OverlayTransform { scale_x: -1.0, scale_y: -1.0, rotation_radians: 0.0 });
    }

    #[test]
    fn stroke_scale_ignores_mirroring() {
        let t = OverlayTransform { scale_x: -2.0, scale_y: -3.0, rotation_radians: 0.0 };
        assert_eq!(t.stroke_scale(), 3.0);
        assert_eq!(OverlayTransform { scale_x: f64::NAN, scale_y: f64::NAN, rotation_radians: 0.0 }.stroke_scale(), 1.0);
    }
}
