use super::timecode::{format_timecode, parse_timecode};
use super::types::{CaptionEntry, CaptionTrack};
use log::{debug, info, warn};

const TIMING_SEPARATOR: &str = " --> ";
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Parse SRT text into a caption track.
///
/// Malformed blocks (fewer than three lines, no timing separator, bad
/// timecodes) are skipped. Entries keep source order; overlapping or inverted
/// timings are passed through untouched.
pub fn parse_caption_track(content: &str) -> CaptionTrack {
    let normalized = normalize(content);
    if normalized.is_empty() {
        return CaptionTrack::default();
    }

    let mut entries = Vec::new();
    let mut discarded = 0usize;

    for (index, block) in normalized.split("\n\n").enumerate() {
        match parse_block(block) {
            Some(entry) => {
                if entry.start_time > entry.end_time {
                    debug!(
                        "Block {} ({}) ends before it starts, keeping as-is",
                        index, entry.id
                    );
                }
                entries.push(entry);
            }
            None => {
                debug!("Discarding malformed caption block {}", index);
                discarded += 1;
            }
        }
    }

    if discarded > 0 {
        warn!("Discarded {} malformed caption blocks", discarded);
    }
    info!("Parsed {} caption entries", entries.len());

    CaptionTrack::new(entries)
}

/// Emit a track in canonical SRT form
pub fn serialize_caption_track(track: &CaptionTrack) -> String {
    let mut out = String::new();
    for (i, entry) in track.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&entry.id);
        out.push('\n');
        out.push_str(&format_timecode(entry.start_time));
        out.push_str(TIMING_SEPARATOR);
        out.push_str(&format_timecode(entry.end_time));
        out.push('\n');
        out.push_str(&entry.text);
        out.push('\n');
    }
    out
}

/// Unify line endings, blank out whitespace-only lines, strip a BOM and trim
fn normalize(content: &str) -> String {
    let unified = content.replace("\r\n", "\n").replace('\r', "\n");
    let unified = unified.trim_start_matches(BYTE_ORDER_MARK);

    unified
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn parse_block(block: &str) -> Option<CaptionEntry> {
    // Runs of three or more line breaks leave blank lines at the block edges
    let block = block.trim_matches('\n');
    let lines: Vec<&str> = block.split('\n').collect();
    if lines.len() < 3 {
        return None;
    }

    let id = lines[0].trim().to_string();

    let (start_text, rest) = lines[1].split_once(TIMING_SEPARATOR)?;
    let end_text = rest.split(TIMING_SEPARATOR).next().unwrap_or(rest);
    let (start_text, end_text) = (start_text.trim(), end_text.trim());
    if start_text.is_empty() || end_text.is_empty() {
        return None;
    }

    let start_time = match parse_timecode(start_text) {
        Ok(seconds) => seconds,
        Err(e) => {
            debug!("Block {}: {}", id, e);
            return None;
        }
    };
    let end_time = match parse_timecode(end_text) {
        Ok(seconds) => seconds,
        Err(e) => {
            debug!("Block {}: {}", id, e);
            return None;
        }
    };

    let text = lines[2..].join("\n").trim().to_string();

    Some(CaptionEntry {
        id,
        start_time,
        end_time,
        text,
    })
}
