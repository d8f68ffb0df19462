/// Turns playback positions into the job's progress percentage.
///
/// Values are `round(100 * position / duration)` clamped to `[0, 100]` and
/// never go backwards, even if the position does.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    duration: f64,
    last: u8,
}

impl ProgressTracker {
    pub fn new(duration: f64) -> Self {
        Self { duration, last: 0 }
    }

    pub fn percent_at(duration: f64, position: f64) -> u8 {
        if !(duration.is_finite() && duration > 0.0) || !position.is_finite() {
            return 0;
        }
        (100.0 * position / duration).round().clamp(0.0, 100.0) as u8
    }

    /// Record a new position and return the value to report
    pub fn update(&mut self, position: f64) -> u8 {
        self.last = self.last.max(Self::percent_at(self.duration, position));
        self.last
    }

    pub fn finish(&mut self) -> u8 {
        self.last = 100;
        self.last
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}
