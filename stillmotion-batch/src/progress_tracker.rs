//! Progress tracking with ETA estimation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use stillmotion_core::BatchProgress;

/// Thread-safe progress tracker with ETA estimation
#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    processed: AtomicU64,
    start_time: Instant,
}

impl ProgressTracker {
    /// Creates a new progress tracker
    pub fn new(total: u64) -> Self {
        Self {
            total,
            processed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records one finished job and returns the updated snapshot
    pub fn record(&self) -> BatchProgress {
        let current = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        self.progress_at(current.min(self.total), self.start_time.elapsed())
    }

    /// Current snapshot without recording anything
    pub fn snapshot(&self) -> BatchProgress {
        self.progress_at(self.processed.load(Ordering::Relaxed), self.start_time.elapsed())
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn progress_at(&self, current: u64, elapsed: Duration) -> BatchProgress {
        BatchProgress {
            completed: current,
            total: self.total,
            elapsed,
            eta: estimate_remaining(current, self.total, elapsed),
        }
    }
}

/// Linear extrapolation from the average time per finished job
fn estimate_remaining(current: u64, total: u64, elapsed: Duration) -> Option<Duration> {
    if current == 0 {
        return None;
    }
    if current >= total {
        return Some(Duration::ZERO);
    }
    let rate = current as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    Some(Duration::from_secs_f64((total - current) as f64 / rate))
}

/// Formats seconds into a human-readable duration string
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor() as u64;
        let remaining = secs - (mins as f64 * 60.0);
        format!("{}m {:.0}s", mins, remaining)
    } else {
        let hours = (secs / 3600.0).floor() as u64;
        let remaining = secs - (hours as f64 * 3600.0);
        let mins = (remaining / 60.0).floor() as u64;
        let remaining_secs = remaining - (mins as f64 * 60.0);
        format!("{}h {}m {:.0}s", hours, mins, remaining_secs)
    }
}
