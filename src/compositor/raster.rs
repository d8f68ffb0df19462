use super::surface::{Surface, SurfaceProvider};
use super::types::Paint;
use crate::errors::SurfaceError;
use fontdue::{Font, FontSettings};
use image::imageops::{resize, FilterType};
use image::{Rgba, RgbaImage};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

/// Largest accepted surface edge in pixels
pub const MAX_SURFACE_DIMENSION: u32 = 16384;

/// Software surface: an RGBA canvas with fontdue glyph coverage blended on top
pub struct RasterSurface {
    canvas: RgbaImage,
    font: Arc<Font>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, font: Arc<Font>) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
            font,
        }
    }
}

impl Surface for RasterSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn draw_frame(&mut self, frame: &RgbaImage) {
        if frame.dimensions() == self.canvas.dimensions() {
            self.canvas.copy_from_slice(frame.as_raw());
        } else {
            let (width, height) = self.canvas.dimensions();
            self.canvas = resize(frame, width, height, FilterType::Triangle);
        }
    }

    fn stroke_text(&mut self, text: &str, x: f32, y: f32, paint: &Paint) {
        let radius = paint.line_width / 2.0;
        let pad = radius.ceil() as i32 + 1;
        if let Some(mask) = CoverageMask::rasterize_line(&self.font, text, x, y, paint.font_size, pad) {
            mask.dilate(radius).blend_onto(&mut self.canvas, paint.color);
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, paint: &Paint) {
        if let Some(mask) = CoverageMask::rasterize_line(&self.font, text, x, y, paint.font_size, 0) {
            mask.blend_onto(&mut self.canvas, paint.color);
        }
    }

    fn snapshot(&self) -> RgbaImage {
        self.canvas.clone()
    }
}

/// Hands out [`RasterSurface`]s sharing one parsed font
#[derive(Clone, Default)]
pub struct RasterSurfaceProvider {
    font: Option<Arc<Font>>,
}

impl RasterSurfaceProvider {
    pub fn new(font: Option<Font>) -> Self {
        Self {
            font: font.map(Arc::new),
        }
    }

    pub fn from_font_bytes(bytes: Vec<u8>) -> Result<Self, SurfaceError> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| SurfaceError::Font(e.to_string()))?;
        Ok(Self::new(Some(font)))
    }

    pub fn from_font_file<P: AsRef<Path>>(path: P) -> Result<Self, SurfaceError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| SurfaceError::Font(format!("{}: {}", path.display(), e)))?;
        info!("Loaded caption font {}", path.display());
        Self::from_font_bytes(bytes)
    }
}

impl SurfaceProvider for RasterSurfaceProvider {
    fn create_surface(&self, width: u32, height: u32) -> Result<Box<dyn Surface>, SurfaceError> {
        if width == 0 || height == 0 || width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        let font = self.font.clone().ok_or(SurfaceError::FontMissing)?;
        debug!("Created {}x{} raster surface", width, height);
        Ok(Box::new(RasterSurface::new(width, height, font)))
    }
}

/// 8-bit coverage over a rectangle of canvas space
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CoverageMask {
    pub left: i32,
    pub top: i32,
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl CoverageMask {
    pub fn new(left: i32, top: i32, width: usize, height: usize) -> Self {
        Self {
            left,
            top,
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }

    /// Rasterise one line of text, centred on `center_x`, sitting on the
    /// descent line at `bottom_y`. `pad` empty pixels surround the glyphs.
    pub fn rasterize_line(
        font: &Font,
        text: &str,
        center_x: f32,
        bottom_y: f32,
        font_size: f32,
        pad: i32,
    ) -> Option<Self> {
        if text.is_empty() || font_size <= 0.0 {
            return None;
        }

        let descent = font
            .horizontal_line_metrics(font_size)
            .map(|m| m.descent)
            .unwrap_or(-0.2 * font_size);
        let baseline = bottom_y + descent;

        let glyphs: Vec<_> = text.chars().map(|ch| font.rasterize(ch, font_size)).collect();
        let advance: f32 = glyphs.iter().map(|(m, _)| m.advance_width).sum();

        // Place glyphs, tracking the union of their boxes
        let mut pen = center_x - advance / 2.0;
        let mut placed = Vec::with_capacity(glyphs.len());
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        for (metrics, bitmap) in &glyphs {
            if metrics.width > 0 && metrics.height > 0 {
                let gx = (pen + metrics.xmin as f32).round() as i32;
                let gy = (baseline - (metrics.ymin as f32 + metrics.height as f32)).round() as i32;
                min_x = min_x.min(gx);
                min_y = min_y.min(gy);
                max_x = max_x.max(gx + metrics.width as i32);
                max_y = max_y.max(gy + metrics.height as i32);
                placed.push((gx, gy, metrics.width, metrics.height, bitmap));
            }
            pen += metrics.advance_width;
        }
        if placed.is_empty() {
            return None;
        }

        let mut mask = CoverageMask::new(
            min_x - pad,
            min_y - pad,
            (max_x - min_x + 2 * pad) as usize,
            (max_y - min_y + 2 * pad) as usize,
        );
        for (gx, gy, width, height, bitmap) in placed {
            let ox = (gx - mask.left) as usize;
            let oy = (gy - mask.top) as usize;
            for row in 0..height {
                for col in 0..width {
                    let index = (oy + row) * mask.width + ox + col;
                    mask.data[index] = mask.data[index].max(bitmap[row * width + col]);
                }
            }
        }
        Some(mask)
    }

    /// Grow coverage by `radius` pixels: each pixel takes the maximum over a disc
    pub fn dilate(&self, radius: f32) -> Self {
        if radius <= 0.0 {
            return self.clone();
        }
        let reach = radius.ceil() as i32;
        let limit = radius * radius;
        let mut offsets = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                if (dx * dx + dy * dy) as f32 <= limit {
                    offsets.push((dx, dy));
                }
            }
        }

        let mut out = CoverageMask::new(self.left, self.top, self.width, self.height);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let value = offsets
                    .iter()
                    .map(|(dx, dy)| self.get(x + dx, y + dy))
                    .max()
                    .unwrap_or(0);
                out.data[y as usize * self.width + x as usize] = value;
            }
        }
        out
    }

    /// Source-over blend of `color` weighted by coverage, clipped to the canvas
    pub fn blend_onto(&self, canvas: &mut RgbaImage, color: Rgba<u8>) {
        let (canvas_width, canvas_height) = canvas.dimensions();
        let color_alpha = color.0[3] as f32 / 255.0;

        for y in 0..self.height {
            let cy = self.top + y as i32;
            if cy < 0 || cy as u32 >= canvas_height {
                continue;
            }
            for x in 0..self.width {
                let coverage = self.data[y * self.width + x];
                if coverage == 0 {
                    continue;
                }
                let cx = self.left + x as i32;
                if cx < 0 || cx as u32 >= canvas_width {
                    continue;
                }

                let alpha = color_alpha * coverage as f32 / 255.0;
                let pixel = canvas.get_pixel_mut(cx as u32, cy as u32);
                for channel in 0..3 {
                    let src = color.0[channel] as f32;
                    let dst = pixel.0[channel] as f32;
                    pixel.0[channel] = (src * alpha + dst * (1.0 - alpha)).round() as u8;
                }
                let dst_alpha = pixel.0[3] as f32;
                pixel.0[3] = (255.0 * alpha + dst_alpha * (1.0 - alpha)).round() as u8;
            }
        }
    }
}
