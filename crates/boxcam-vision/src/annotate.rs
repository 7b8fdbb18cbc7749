use std::f64::consts::PI;

use boxcam_geom::PixelRect;
use image::Rgb;

pub const DEFAULT_BOX_COLOR: Rgb<u8> = Rgb([36, 101, 255]);
pub const DEFAULT_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const STROKE_PX: f64 = 3.0;
const CORNER_RADIUS_PX: f64 = 6.0;
const LABEL_PAD_PX: f64 = 6.0;
const FONT_TO_BOX_HEIGHT: f64 = 1.8;

/// Drawing parameters for one annotation, in frame pixels. The overlay layer
/// is scaled by `scale` afterwards, so screen-constant sizes are divided by it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub stroke_width: f64,
    pub corner_radius: f64,
    pub font_size: f64,
    pub label_padding: f64,
    /// The overlay is mirrored on both axes; turning the label half a turn
    /// makes it read upright.
    pub label_rotation: f64,
}

impl AnnotationStyle {
    pub fn for_rect(rect: &PixelRect, scale: f64) -> Self {
        let inv = 1.0 / sanitize_scale(scale);
        Self {
            stroke_width: STROKE_PX * inv,
            corner_radius: CORNER_RADIUS_PX * inv,
            font_size: FONT_TO_BOX_HEIGHT * rect.height * inv,
            label_padding: LABEL_PAD_PX * inv,
            label_rotation: PI,
        }
    }

    /// Label frame centred in `rect`, given the renderer's measured text size.
    pub fn label_frame(&self, rect: &PixelRect, text_width: f64, text_height: f64) -> PixelRect {
        let w = text_width + self.label_padding;
        let h = text_height;
        PixelRect {
            x: rect.x + (rect.width - w) / 2.0,
            y: rect.y + (rect.height - h) / 2.0,
            width: w,
            height: h,
        }
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    let s = scale.abs();
    if s.is_finite() && s > 0.0 { s } else { 1.0 }
}

/// What the renderer draws for one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Frame pixels, top-left origin. The shared overlay transform does the rest.
    pub rect: PixelRect,
    pub label: String,
    pub confidence: f32,
    pub color: Rgb<u8>,
    pub text_color: Rgb<u8>,
    pub style: AnnotationStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_shrink_with_overlay_scale() {
        let rect = PixelRect::new(10.0, 20.0, 40.0, 10.0);
        let s = AnnotationStyle::for_rect(&rect, 2.0);
        assert_eq!(s.stroke_width, 1.5);
        assert_eq!(s.corner_radius, 3.0);
        assert_eq!(s.font_size, 9.0);
        assert_eq!(s.label_padding, 3.0);
        assert_eq!(s.label_rotation, PI);

        // mirrored scales behave like their magnitude
        assert_eq!(AnnotationStyle::for_rect(&rect, -2.0), s);
    }

    #[test]
    fn degenerate_scale_means_unscaled() {
        let rect = PixelRect::new(0.0, 0.0, 10.0, 10.0);
        for bad in [0.0, f64::NAN, f64::INFINITY] {
            let s = AnnotationStyle::for_rect(&rect, bad);
            assert_eq!(s.stroke_width, 3.0);
            assert_eq!(s.font_size, 18.0);
        }
    }

    #[test]
    fn label_is_centred() {
        let rect = PixelRect::new(100.0, 50.0, 80.0, 40.0);
        let s = AnnotationStyle::for_rect(&rect, 1.0);
        let label = s.label_frame(&rect, 30.0, 12.0);
        assert_eq!(label.width, 36.0);
        assert_eq!(label.height, 12.0);
        assert_eq!(label.center(), rect.center());
    }
}
