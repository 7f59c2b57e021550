//! Progress reporting for long-running operations.
use indicatif::ProgressBar;

/// Receives progress notifications.
///
/// Implementations are called from worker threads and must not panic;
/// a failing sink never aborts the operation it is reporting on.
pub trait Progress: Sync {
    /// Describe the operation in progress.
    fn set_description(&self, description: &str);
    /// Announce how many ticks the operation will emit.
    fn set_length(&self, _length: usize) {}
    /// Record one finished unit of work.
    fn tick(&self);
}

/// Discards all progress notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn set_description(&self, _description: &str) {}
    fn tick(&self) {}
}

impl Progress for ProgressBar {
    fn set_description(&self, description: &str) {
        self.set_message(description.to_owned());
    }

    fn set_length(&self, length: usize) {
        ProgressBar::set_length(self, length as u64);
    }

    fn tick(&self) {
        self.inc(1);
    }
}
