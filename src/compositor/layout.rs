use super::types::{CaptionLine, CaptionStyle};

/// Lay out caption text bottom-up: index 0 is the last line of `text` and
/// sits lowest, each earlier line one line-height above it.
pub fn layout_caption(
    text: &str,
    frame_width: u32,
    frame_height: u32,
    style: &CaptionStyle,
) -> Vec<CaptionLine> {
    if text.is_empty() {
        return Vec::new();
    }

    let height = frame_height as f32;
    let font_size = (height * style.font_ratio).floor();
    let line_height = font_size * style.line_height_ratio;
    let bottom = height - height * style.bottom_margin_ratio;
    let x = frame_width as f32 / 2.0;

    text.split('\n')
        .rev()
        .enumerate()
        .map(|(index, line)| CaptionLine {
            text: line.to_string(),
            x,
            y: bottom - index as f32 * line_height,
            font_size,
            stroke_width: font_size * style.stroke_width_ratio,
        })
        .collect()
}
