mod parser;
mod timecode;
mod timeline;
mod types;

pub use parser::{parse_caption_track, serialize_caption_track};
pub use timecode::{format_timecode, parse_timecode};
pub use timeline::{active_entry, TimelineCursor};
pub use types::{CaptionEntry, CaptionTrack};

#[cfg(test)]
pub mod unit_test;
