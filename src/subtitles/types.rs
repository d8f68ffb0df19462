use serde::{Deserialize, Serialize};

/// One timed caption block
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CaptionEntry {
    pub id: String,
    pub start_time: f64, // seconds
    pub end_time: f64,   // seconds
    /// One physical line per language when bilingual
    pub text: String,
}

impl CaptionEntry {
    pub fn new(id: impl Into<String>, start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
            text: text.into(),
        }
    }

    /// Inclusive on both bounds
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t <= self.end_time
    }
}

/// Caption entries in source order. Not sorted, not deduplicated.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CaptionTrack {
    entries: Vec<CaptionEntry>,
}

impl CaptionTrack {
    pub fn new(entries: Vec<CaptionEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CaptionEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CaptionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest end time in the track, `0.0` when empty
    pub fn duration_hint(&self) -> f64 {
        self.entries
            .iter()
            .map(|entry| entry.end_time)
            .fold(0.0, f64::max)
    }

    pub fn active_entry(&self, t: f64) -> Option<&CaptionEntry> {
        super::timeline::active_entry(self, t)
    }
}

impl From<Vec<CaptionEntry>> for CaptionTrack {
    fn from(entries: Vec<CaptionEntry>) -> Self {
        Self::new(entries)
    }
}

impl<'a> IntoIterator for &'a CaptionTrack {
    type Item = &'a CaptionEntry;
    type IntoIter = std::slice::Iter<'a, CaptionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
