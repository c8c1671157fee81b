use chapter_merge_core::{MergeResult, MergeStatus, ProgressReporter};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Scan phase: spinner
/// - Merge phase: one bar over the selected sessions, advanced as workers
///   finish; the message lists the sessions currently merging
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    running: Mutex<Vec<String>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            running: Mutex::new(Vec::new()),
        }
    }

    fn bar(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        // A worker that panicked mid-update leaves nothing worth protecting.
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.bar().take() {
            pb.finish_and_clear();
        }
    }

    fn update_running(&self, update: impl FnOnce(&mut Vec<String>)) {
        let mut running = self
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut running);
        if let Some(pb) = self.bar().as_ref() {
            pb.set_message(running.join(", "));
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars(TICK_CHARS));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, directory: &Path) {
        self.set_bar(spinner(&format!("Scanning {}...", directory.display())));
    }

    fn on_scan_complete(&self, sessions: usize, chapters: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Scan complete: {} sessions, {} chapter files in {:.2}s",
            "✓".green(),
            sessions,
            chapters,
            duration_secs
        );
    }

    fn on_merge_start(&self, total_sessions: usize) {
        let pb = ProgressBar::new(total_sessions as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Merging [{bar:30.cyan/dim}] {pos}/{len} sessions ({elapsed}) {msg}",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_session_start(&self, session_key: &str, _chapters: usize) {
        self.update_running(|running| running.push(session_key.to_string()));
    }

    fn on_session_complete(&self, result: &MergeResult) {
        let key = result.session_key().to_string();
        self.update_running(|running| running.retain(|k| *k != key));

        let line = match result.status() {
            MergeStatus::Succeeded => format!("{} {}", "✓".green(), result.session_key()),
            MergeStatus::Failed => format!(
                "{} {}: {}",
                "✗".red(),
                result.session_key(),
                result
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_default()
            ),
            MergeStatus::Skipped => format!(
                "{} {}: {}",
                "-".yellow(),
                result.session_key(),
                result
                    .skip_reason()
                    .map(|r| r.to_string())
                    .unwrap_or_default()
            ),
        };

        if let Some(pb) = self.bar().as_ref() {
            pb.println(format!("    {}", line));
            pb.inc(1);
        }
    }

    fn on_merge_complete(&self, results: &[MergeResult], duration_secs: f64) {
        self.finish_bar();
        let succeeded = results
            .iter()
            .filter(|r| r.status() == MergeStatus::Succeeded)
            .count();
        eprintln!(
            "  {} Merge complete: {}/{} sessions in {:.2}s",
            "✓".green(),
            succeeded,
            results.len(),
            duration_secs
        );
    }
}
