use crate::backend;
use crate::cancel::CancelFlag;
use crate::config::AppConfig;
use crate::dispatch::{DispatchSettings, Dispatcher};
use crate::error::Error;
use crate::model::{RunReport, ScanOutcome, Session};
use crate::progress::ProgressReporter;
use crate::scanner;
use crate::selection::{self, Selection};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct MergeEngine {
    config: AppConfig,
    cancel: CancelFlag,
}

impl MergeEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Scan `directory` with the configured filename pattern.
    pub fn scan(
        &self,
        directory: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanOutcome, Error> {
        let pattern = self.config.pattern()?;
        info!("Scanning {} for chaptered files...", directory.display());
        reporter.on_scan_start(directory);

        let scan_start = Instant::now();
        let outcome = scanner::scan(directory, &pattern)?;
        let scan_duration = scan_start.elapsed();

        reporter.on_scan_complete(
            outcome.sessions.len(),
            outcome.chapter_count(),
            scan_duration.as_secs_f64(),
        );
        debug!(
            "Scan completed in {:.2}s: {} sessions, {} candidates, {} ambiguous",
            scan_duration.as_secs_f64(),
            outcome.sessions.len(),
            outcome.candidates().count(),
            outcome.ambiguous().count(),
        );
        Ok(outcome)
    }

    /// Merge the selected candidate sessions of a scan:
    /// 1. Split off ambiguous and single-chapter sessions
    /// 2. Apply the user's selection
    /// 3. Dispatch the rest on the worker pool
    pub fn merge(
        &self,
        outcome: ScanOutcome,
        selection: &Selection,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunReport, Error> {
        self.config.validate()?;
        let run_start = Instant::now();

        let ScanOutcome {
            sessions, warnings, ..
        } = outcome;

        let (candidates, others): (Vec<Session>, Vec<Session>) =
            sessions.into_iter().partition(|s| s.is_merge_candidate());
        let (ambiguous, complete): (Vec<Session>, Vec<Session>) =
            others.into_iter().partition(|s| s.ambiguous);

        for session in &ambiguous {
            warn!(
                "Not merging '{}': duplicate chapter indices, resolve manually",
                session.key
            );
        }

        let sieved = selection::sieve(candidates.iter().map(|s| s.key.as_str()), selection);
        if !sieved.unknown.is_empty() {
            warn!("Ignoring unknown session keys: {:?}", sieved.unknown);
        }
        let selected: Vec<Session> = candidates
            .into_iter()
            .filter(|s| sieved.selected.contains(&s.key))
            .collect();

        let results = if selected.is_empty() {
            info!("Nothing to merge");
            Vec::new()
        } else {
            let dispatcher = self.dispatcher()?;
            info!(
                "Merging {} sessions with the {} backend ({} worker(s))...",
                selected.len(),
                dispatcher.backend_kind(),
                self.config.parallelism
            );
            dispatcher.dispatch_all(&selected, self.config.parallelism, reporter)
        };

        Ok(RunReport {
            results,
            ambiguous,
            complete,
            deselected: sieved.deselected,
            unknown_selection: sieved.unknown,
            warnings,
            duration: run_start.elapsed(),
        })
    }

    /// Scan and merge every candidate.
    pub fn run(&self, directory: &Path, reporter: &dyn ProgressReporter) -> Result<RunReport, Error> {
        let outcome = self.scan(directory, reporter)?;
        self.merge(outcome, &Selection::All, reporter)
    }

    fn dispatcher(&self) -> Result<Dispatcher, Error> {
        let output_directory = &self.config.output_directory;
        if !output_directory.is_dir() {
            warn!(
                "Output directory {} does not exist, creating it",
                output_directory.display()
            );
            fs::create_dir_all(output_directory)?;
        }

        let mut settings = DispatchSettings::from_config(&self.config);
        settings.output_directory = fs::canonicalize(output_directory)?;

        let backend = backend::backend_for(self.config.backend, &self.config.binaries);
        Ok(Dispatcher::new(backend, settings).with_cancel_flag(self.cancel.clone()))
    }
}
