use super::layout::layout_caption;
use super::types::{Paint, CAPTION_STYLE};
use crate::errors::SurfaceError;
use image::RgbaImage;

/// 2-D drawing capability the compositor paints through
pub trait Surface {
    fn dimensions(&self) -> (u32, u32);

    /// Replace the whole surface with `frame`, scaling if sizes differ
    fn draw_frame(&mut self, frame: &RgbaImage);

    /// Outline `text` centred on `x`, with `y` as the bottom of the line box
    fn stroke_text(&mut self, text: &str, x: f32, y: f32, paint: &Paint);

    /// Fill `text` centred on `x`, with `y` as the bottom of the line box
    fn fill_text(&mut self, text: &str, x: f32, y: f32, paint: &Paint);

    fn snapshot(&self) -> RgbaImage;
}

/// Creates compositing surfaces once the source dimensions are known
pub trait SurfaceProvider {
    fn create_surface(&self, width: u32, height: u32) -> Result<Box<dyn Surface>, SurfaceError>;
}

/// Draw `frame` and, when `active_text` is non-empty, the caption on top.
///
/// Every line is outlined first and filled second. The surface is fully
/// overwritten by `frame`, so nothing carries over between calls.
pub fn composite(surface: &mut dyn Surface, frame: &RgbaImage, active_text: Option<&str>) -> RgbaImage {
    surface.draw_frame(frame);

    if let Some(text) = active_text.filter(|text| !text.is_empty()) {
        let (width, height) = surface.dimensions();
        for line in layout_caption(text, width, height, &CAPTION_STYLE) {
            let stroke = Paint {
                font_size: line.font_size,
                color: CAPTION_STYLE.stroke_color,
                line_width: line.stroke_width,
            };
            surface.stroke_text(&line.text, line.x, line.y, &stroke);

            let fill = Paint {
                font_size: line.font_size,
                color: CAPTION_STYLE.fill_color,
                line_width: 0.0,
            };
            surface.fill_text(&line.text, line.x, line.y, &fill);
        }
    }

    surface.snapshot()
}
