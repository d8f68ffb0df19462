use super::types::{CaptionEntry, CaptionTrack};

/// First entry in track order whose `[start_time, end_time]` contains `t`.
///
/// Overlaps resolve to the earlier entry in the track. A linear scan is
/// enough: this runs once per rendered frame over a few hundred entries.
pub fn active_entry(track: &CaptionTrack, t: f64) -> Option<&CaptionEntry> {
    track.iter().find(|entry| entry.contains(t))
}

/// Per-pass lookup helper for monotonically advancing playback.
///
/// Remembers the last hit together with the latest end time of every entry
/// before it. While `t` stays inside the hit and past that end time, no
/// earlier entry can contain `t`, so the hint is returned without a scan.
/// Results always match [`active_entry`].
#[derive(Debug, Default, Clone)]
pub struct TimelineCursor {
    last: Option<Hint>,
}

#[derive(Debug, Clone, Copy)]
struct Hint {
    index: usize,
    earlier_end: f64,
}

impl TimelineCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active<'a>(&mut self, track: &'a CaptionTrack, t: f64) -> Option<&'a CaptionEntry> {
        let entries = track.entries();

        if let Some(hint) = self.last {
            if let Some(entry) = entries.get(hint.index) {
                if t > hint.earlier_end && entry.contains(t) {
                    return Some(entry);
                }
            }
        }

        let index = entries.iter().position(|entry| entry.contains(t))?;
        let earlier_end = entries[..index]
            .iter()
            .map(|entry| entry.end_time)
            .fold(f64::NEG_INFINITY, f64::max);
        self.last = Some(Hint { index, earlier_end });
        Some(&entries[index])
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Whether a lookup at `t` would be answered from the remembered hit
    #[cfg(test)]
    pub(crate) fn is_warm_at(&self, track: &CaptionTrack, t: f64) -> bool {
        self.last
            .and_then(|hint| track.entries().get(hint.index).map(|entry| (hint, entry)))
            .map(|(hint, entry)| t > hint.earlier_end && entry.contains(t))
            .unwrap_or(false)
    }
}
