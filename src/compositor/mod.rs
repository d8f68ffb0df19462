mod font;
mod layout;
mod raster;
mod surface;
mod types;

pub use font::discover_system_font;
pub use layout::layout_caption;
pub use raster::{RasterSurface, RasterSurfaceProvider, MAX_SURFACE_DIMENSION};
pub use surface::{composite, Surface, SurfaceProvider};
pub use types::{CaptionLine, CaptionStyle, Paint, CAPTION_STYLE};
