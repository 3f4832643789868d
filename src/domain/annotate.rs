use super::detection::Detection;
use ab_glyph::FontArc;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const COUNT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 16.0;
const COUNT_SCALE: f32 = 32.0;

/// Fonts tried when no label font is configured.
const SYSTEM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Draws person boxes, confidence labels and the running count onto frames.
///
/// Text needs a font; without one only boxes are drawn.
#[derive(Clone, Default)]
pub struct Annotator {
    font: Option<FontArc>,
}

impl Annotator {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    /// Loads the configured font, falling back to well-known system fonts.
    pub fn with_font_path(configured: Option<&Path>) -> Self {
        let candidates = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

        for path in candidates {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            match FontArc::try_from_vec(bytes) {
                Ok(font) => {
                    debug!(path = %path.display(), "loaded label font");
                    return Self::new(Some(font));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "unusable label font"),
            }
        }

        warn!("no label font available, frames will carry boxes only");
        Self::new(None)
    }

    pub fn annotate(&self, frame: &mut RgbImage, persons: &[Detection], person_count: usize) {
        let (width, height) = frame.dimensions();

        for detection in persons {
            let x1 = (detection.bbox.x1.max(0.0) as i32).min(width as i32 - 1);
            let y1 = (detection.bbox.y1.max(0.0) as i32).min(height as i32 - 1);
            let x2 = (detection.bbox.x2 as i32).clamp(x1, width as i32 - 1);
            let y2 = (detection.bbox.y2 as i32).clamp(y1, height as i32 - 1);

            for inset in 0..BOX_THICKNESS {
                let w = x2 - x1 + 1 - 2 * inset;
                let h = y2 - y1 + 1 - 2 * inset;
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(frame, rect, BOX_COLOR);
            }

            if let Some(font) = &self.font {
                let label = format!("Person {:.2}", detection.confidence);
                let label_y = (y1 - 10 - LABEL_SCALE as i32).max(0);
                draw_text_mut(frame, BOX_COLOR, x1, label_y, LABEL_SCALE, font, &label);
            }
        }

        if let Some(font) = &self.font {
            let text = format!("Count: {}", person_count);
            draw_text_mut(frame, COUNT_COLOR, 20, 12, COUNT_SCALE, font, &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::BBox;

    fn person(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            class_id: 0,
            confidence: 0.87,
            bbox: BBox { x1, y1, x2, y2 },
        }
    }

    #[test]
    fn test_box_outline_is_drawn() {
        let mut frame = RgbImage::new(64, 48);
        Annotator::default().annotate(&mut frame, &[person(10.0, 10.0, 30.0, 30.0)], 1);

        assert_eq!(*frame.get_pixel(10, 10), BOX_COLOR);
        assert_eq!(*frame.get_pixel(11, 20), BOX_COLOR);
        assert_eq!(*frame.get_pixel(30, 30), BOX_COLOR);
        assert_eq!(*frame.get_pixel(20, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_out_of_frame_boxes_are_clamped() {
        let mut frame = RgbImage::new(32, 32);
        Annotator::default().annotate(&mut frame, &[person(-20.0, -5.0, 500.0, 400.0)], 1);

        assert_eq!(*frame.get_pixel(0, 0), BOX_COLOR);
        assert_eq!(*frame.get_pixel(31, 31), BOX_COLOR);
    }

    #[test]
    fn test_degenerate_box_does_not_panic() {
        let mut frame = RgbImage::new(16, 16);
        Annotator::default().annotate(&mut frame, &[person(40.0, 40.0, 10.0, 10.0)], 1);
    }
}
