use std::sync::Mutex;
use std::time::Instant;

/// Shared notion of the current playback position, in seconds
pub trait Clock: Send + Sync {
    fn position(&self) -> f64;
}

/// Wall clock that starts counting when playback starts
#[derive(Debug, Default)]
pub struct PlaybackClock {
    started_at: Mutex<Option<Instant>>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) counting from zero
    pub fn start(&self) {
        if let Ok(mut started_at) = self.started_at.lock() {
            *started_at = Some(Instant::now());
        }
    }
}

impl Clock for PlaybackClock {
    fn position(&self) -> f64 {
        match self.started_at.lock() {
            Ok(started_at) => started_at
                .map(|instant| instant.elapsed().as_secs_f64())
                .unwrap_or(0.0),
            Err(_) => 0.0,
        }
    }
}
