// file: src/utils/progress.rs
// description: terminal spinner for pipeline stages and per-session answer statistics
// reference: uses indicatif for progress display and tracks session metrics

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub questions_answered: usize,
    pub questions_failed: usize,
    pub duration_secs: u64,
}

impl SessionStats {
    pub fn success_rate(&self) -> f64 {
        let total = self.questions_answered + self.questions_failed;
        if total == 0 {
            return 0.0;
        }
        (self.questions_answered as f64 / total as f64) * 100.0
    }
}

/// Counts answered and failed questions over an interactive session.
pub struct SessionTracker {
    answered: AtomicUsize,
    failed: AtomicUsize,
    start_time: Instant,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            answered: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_answer(&self) {
        self.answered.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get_stats(&self) -> SessionStats {
        SessionStats {
            questions_answered: self.answered.load(Ordering::SeqCst),
            questions_failed: self.failed.load(Ordering::SeqCst),
            duration_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Spinner shown while a question travels through the pipeline.
pub struct StageSpinner {
    bar: ProgressBar,
}

impl StageSpinner {
    pub fn new(message: &str, colored: bool) -> Self {
        let template = if colored {
            "{spinner:.green} [{elapsed}] {msg}"
        } else {
            "{spinner} [{elapsed}] {msg}"
        };

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template(template) {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar }
    }

    /// Spinner that never draws; used when output is not a terminal.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for StageSpinner {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_success_rate() {
        let tracker = SessionTracker::new();
        tracker.record_answer();
        tracker.record_answer();
        tracker.record_answer();
        tracker.record_failure();

        let stats = tracker.get_stats();
        assert_eq!(stats.questions_answered, 3);
        assert_eq!(stats.questions_failed, 1);
        assert_eq!(stats.success_rate(), 75.0);
    }

    #[test]
    fn test_session_stats_empty() {
        let stats = SessionStats::default();
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_hidden_spinner_accepts_messages() {
        let spinner = StageSpinner::hidden();
        spinner.set_message("translating question");
        spinner.finish();
    }
}
