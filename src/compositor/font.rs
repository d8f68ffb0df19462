use log::debug;
use std::path::{Path, PathBuf};

/// Well-known locations of fonts covering Latin and CJK captions
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\msjh.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// First existing font from the well-known system locations
pub fn discover_system_font() -> Option<PathBuf> {
    find_first_existing(SYSTEM_FONT_CANDIDATES.iter().map(Path::new))
}

pub(crate) fn find_first_existing<'a, I>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    for candidate in candidates {
        if candidate.is_file() {
            debug!("Using system font {}", candidate.display());
            return Some(candidate.to_path_buf());
        }
    }
    None
}
