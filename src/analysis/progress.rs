//! Per-run progress registry

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::RunStatus;

/// Status as reported to callers, including unknown sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Pending,
    Running,
    Completed,
    Failed,
    NotFound,
}

impl From<RunStatus> for ProgressStatus {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Pending => ProgressStatus::Pending,
            RunStatus::Running => ProgressStatus::Running,
            RunStatus::Completed => ProgressStatus::Completed,
            RunStatus::Failed => ProgressStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub session_id: String,
    pub processed: usize,
    pub total: usize,
    pub percentage: f64,
    pub status: ProgressStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
struct RunProgress {
    processed: usize,
    total: usize,
    status: RunStatus,
    error: Option<String>,
    finished_at: Option<Instant>,
}

/// Live progress of every run started by this process
#[derive(Debug, Default)]
pub struct ProgressTracker {
    runs: RwLock<HashMap<String, RunProgress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run that is about to fetch `total` variants
    pub fn begin(&self, session_id: &str, total: usize) {
        self.runs.write().insert(
            session_id.to_string(),
            RunProgress {
                processed: 0,
                total,
                status: RunStatus::Pending,
                error: None,
                finished_at: None,
            },
        );
    }

    pub fn update(&self, session_id: &str, processed: usize) {
        if let Some(progress) = self.runs.write().get_mut(session_id) {
            // processed only moves forward
            progress.processed = progress.processed.max(processed.min(progress.total));
            if progress.status == RunStatus::Pending {
                progress.status = RunStatus::Running;
            }
        }
    }

    pub fn set_running(&self, session_id: &str) {
        if let Some(progress) = self.runs.write().get_mut(session_id) {
            progress.status = RunStatus::Running;
        }
    }

    pub fn finish(&self, session_id: &str) {
        if let Some(progress) = self.runs.write().get_mut(session_id) {
            progress.processed = progress.total;
            progress.status = RunStatus::Completed;
            progress.finished_at = Some(Instant::now());
        }
    }

    pub fn fail(&self, session_id: &str, error: impl Into<String>) {
        if let Some(progress) = self.runs.write().get_mut(session_id) {
            progress.status = RunStatus::Failed;
            progress.error = Some(error.into());
            progress.finished_at = Some(Instant::now());
        }
    }

    pub fn report(&self, session_id: &str) -> ProgressReport {
        match self.runs.read().get(session_id) {
            Some(progress) => {
                let percentage = if progress.total == 0 {
                    if progress.status.is_finished() { 100.0 } else { 0.0 }
                } else {
                    (progress.processed as f64 / progress.total as f64 * 1000.0).round() / 10.0
                };
                ProgressReport {
                    session_id: session_id.to_string(),
                    processed: progress.processed,
                    total: progress.total,
                    percentage,
                    status: progress.status.into(),
                    error: progress.error.clone(),
                }
            }
            None => ProgressReport {
                session_id: session_id.to_string(),
                processed: 0,
                total: 0,
                percentage: 0.0,
                status: ProgressStatus::NotFound,
                error: None,
            },
        }
    }

    /// Drop finished runs older than `ttl`. Returns how many were removed.
    pub fn purge_expired(&self, ttl: Duration) -> usize {
        let mut runs = self.runs.write();
        let before = runs.len();
        runs.retain(|_, progress| match progress.finished_at {
            Some(at) => at.elapsed() < ttl,
            None => true,
        });
        before - runs.len()
    }

    pub fn len(&self) -> usize {
        self.runs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_session_not_found() {
        let tracker = ProgressTracker::new();
        let report = tracker.report("nope");
        assert_eq!(report.status, ProgressStatus::NotFound);
        assert_eq!(report.total, 0);
    }

    #[test]
    fn test_progress_lifecycle() {
        let tracker = ProgressTracker::new();
        tracker.begin("s1", 8);
        assert_eq!(tracker.report("s1").status, ProgressStatus::Pending);

        tracker.update("s1", 2);
        let report = tracker.report("s1");
        assert_eq!(report.status, ProgressStatus::Running);
        assert_eq!(report.percentage, 25.0);

        tracker.update("s1", 1);
        assert_eq!(tracker.report("s1").processed, 2);

        tracker.finish("s1");
        let report = tracker.report("s1");
        assert_eq!(report.status, ProgressStatus::Completed);
        assert_eq!(report.percentage, 100.0);
    }

    #[test]
    fn test_failure_keeps_error() {
        let tracker = ProgressTracker::new();
        tracker.begin("s1", 3);
        tracker.fail("s1", "store unavailable");
        let report = tracker.report("s1");
        assert_eq!(report.status, ProgressStatus::Failed);
        assert_eq!(report.error.as_deref(), Some("store unavailable"));
    }

    #[test]
    fn test_purge_only_finished() {
        let tracker = ProgressTracker::new();
        tracker.begin("done", 1);
        tracker.begin("live", 1);
        tracker.finish("done");

        assert_eq!(tracker.purge_expired(Duration::ZERO), 1);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.report("live").status, ProgressStatus::Pending);
        assert_eq!(tracker.report("done").status, ProgressStatus::NotFound);
    }
}
