use image::Rgba;

/// Fixed caption styling. Ratios are relative to the frame height or the font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionStyle {
    pub font_ratio: f32,
    pub bottom_margin_ratio: f32,
    pub line_height_ratio: f32,
    pub stroke_width_ratio: f32,
    pub stroke_color: Rgba<u8>,
    pub fill_color: Rgba<u8>,
}

/// Black outline at 0.8 alpha under opaque white text
pub const CAPTION_STYLE: CaptionStyle = CaptionStyle {
    font_ratio: 0.05,
    bottom_margin_ratio: 0.10,
    line_height_ratio: 1.2,
    stroke_width_ratio: 0.15,
    stroke_color: Rgba([0, 0, 0, 204]),
    fill_color: Rgba([255, 255, 255, 255]),
};

/// Geometry of one caption line, ready to draw
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    pub text: String,
    /// Horizontal centre
    pub x: f32,
    /// Bottom of the line box
    pub y: f32,
    pub font_size: f32,
    pub stroke_width: f32,
}

/// How a text run is painted on a [`super::Surface`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub font_size: f32,
    pub color: Rgba<u8>,
    /// Outline width, ignored by fills
    pub line_width: f32,
}
