//! Progress reporting for long-running comparisons.

use serde::{Deserialize, Serialize};

/// Snapshot of a comparison's progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Index of the row being processed, 1-based. Zero before the first row.
    pub current: usize,
    pub total: usize,
    pub done: bool,
    pub message: String,
    /// Set when the comparison stopped before producing a report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Progress {
    pub fn starting() -> Self {
        Self {
            message: "Starting...".to_string(),
            ..Self::default()
        }
    }

    /// Progress for a comparison that ended with an error.
    pub fn failed(&self, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            current: self.current,
            total: self.total,
            done: true,
            message: format!("Comparison failed: {}", error),
            error: Some(error),
        }
    }

    /// Fraction complete in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.done {
            return 1.0;
        }
        if self.total == 0 {
            return 0.0;
        }
        self.current as f64 / self.total as f64
    }
}

/// Receives progress updates from a running comparison.
pub trait ProgressSink: Send + Sync {
    fn update(&self, progress: &Progress);
}

/// Discards all progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _progress: &Progress) {}
}
