use crate::model::MergeResult;
use std::path::Path;

/// Trait for reporting scan and merge progress.
///
/// The CLI implements it with indicatif. All methods have default no-op
/// implementations. Session callbacks may arrive from several worker threads
/// at once when parallelism is above 1.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _directory: &Path) {}
    fn on_scan_complete(&self, _sessions: usize, _chapters: usize, _duration_secs: f64) {}
    fn on_merge_start(&self, _total_sessions: usize) {}
    fn on_session_start(&self, _session_key: &str, _chapters: usize) {}
    fn on_session_complete(&self, _result: &MergeResult) {}
    fn on_merge_complete(&self, _results: &[MergeResult], _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
