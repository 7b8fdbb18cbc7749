use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::annotate::Annotation;

const OUTLINE_PX: i32 = 2;

/// Stroke annotation outlines onto a frame-space image.
pub fn draw_snapshot<'a>(image: &mut RgbImage, annotations: impl IntoIterator<Item = &'a Annotation>) {
    let (iw, ih) = (image.width() as i32, image.height() as i32);
    for a in annotations {
        if a.rect.is_empty() {
            continue;
        }
        let x0 = a.rect.x.round() as i32;
        let y0 = a.rect.y.round() as i32;
        let x1 = a.rect.max_x().round() as i32;
        let y1 = a.rect.max_y().round() as i32;

        for inset in 0..OUTLINE_PX {
            let (x, y) = (x0.saturating_add(inset).max(0), y0.saturating_add(inset).max(0));
            let (xe, ye) = (x1.saturating_sub(inset).min(iw), y1.saturating_sub(inset).min(ih));
            if xe <= x || ye <= y {
                break;
            }
            let rect = Rect::at(x, y).of_size((xe - x) as u32, (ye - y) as u32);
            draw_hollow_rect_mut(image, rect, a.color);
        }
    }
}

pub fn write_snapshot<'a>(
    path: impl AsRef<Path>,
    pixels: &RgbImage,
    annotations: impl IntoIterator<Item = &'a Annotation>,
) -> Result<()> {
    let path = path.as_ref();
    let mut img = pixels.clone();
    draw_snapshot(&mut img, annotations);
    img.save(path).with_context(|| format!("write snapshot {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{AnnotationStyle, DEFAULT_BOX_COLOR, DEFAULT_TEXT_COLOR};
    use boxcam_geom::PixelRect;
    use image::Rgb;

    fn annotation(rect: PixelRect) -> Annotation {
        Annotation {
            rect,
            label: "up".into(),
            confidence: 0.5,
            color: DEFAULT_BOX_COLOR,
            text_color: DEFAULT_TEXT_COLOR,
            style: AnnotationStyle::for_rect(&rect, 1.0),
        }
    }

    #[test]
    fn outlines_without_filling() {
        let mut img = RgbImage::new(40, 30);
        draw_snapshot(&mut img, &[annotation(PixelRect::new(5.0, 5.0, 20.0, 10.0))]);
        assert_eq!(*img.get_pixel(5, 5), DEFAULT_BOX_COLOR);
        assert_eq!(*img.get_pixel(6, 10), DEFAULT_BOX_COLOR);
        assert_eq!(*img.get_pixel(15, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn clips_to_image_and_ignores_empty() {
        let mut img = RgbImage::new(10, 10);
        draw_snapshot(
            &mut img,
            &[annotation(PixelRect::new(-5.0, -5.0, 30.0, 30.0)), annotation(PixelRect::new(3.0, 3.0, 0.0, 0.0))],
        );
        assert_eq!(*img.get_pixel(0, 0), DEFAULT_BOX_COLOR);
        assert_eq!(*img.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn huge_coordinates_do_not_overflow() {
        let mut img = RgbImage::new(10, 10);
        draw_snapshot(
            &mut img,
            &[
                annotation(PixelRect::new(f64::MAX, f64::MAX, 1.0, 1.0)),
                annotation(PixelRect::new(f64::MIN, f64::MIN, f64::MAX, f64::MAX)),
            ],
        );
        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 0]));
    }
}
