use crate::backend::{process, MergeBackend};
use crate::cancel::CancelFlag;
use crate::config::{AppConfig, BackendKind};
use crate::error::DispatchError;
use crate::model::{MergeResult, Session, SkipReason};
use crate::progress::ProgressReporter;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub output_directory: PathBuf,
    pub output_prefix: String,
    pub output_extension: String,
    pub overwrite: bool,
    pub case_insensitive_outputs: bool,
    pub timeout: Option<Duration>,
}

impl DispatchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            output_directory: config.output_directory.clone(),
            output_prefix: config.output_prefix.clone(),
            output_extension: config.output_extension.trim_start_matches('.').to_string(),
            overwrite: config.overwrite,
            case_insensitive_outputs: config.case_insensitive_outputs,
            timeout: config.timeout(),
        }
    }
}

/// Runs one backend invocation per session and records the outcome.
///
/// Output paths are claimed in a registry shared by all workers; two sessions
/// can never write the same file during one run. With
/// `case_insensitive_outputs` set, claims ignore ASCII case so that `CLIP`
/// and `clip` collide as they would on a case-insensitive file system.
pub struct Dispatcher {
    backend: Box<dyn MergeBackend>,
    settings: DispatchSettings,
    claims: DashMap<String, String>,
    cancel: CancelFlag,
}

impl Dispatcher {
    pub fn new(backend: Box<dyn MergeBackend>, settings: DispatchSettings) -> Self {
        Self {
            backend,
            settings,
            claims: DashMap::new(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn output_path(&self, session_key: &str) -> PathBuf {
        self.settings.output_directory.join(format!(
            "{}-{}.{}",
            self.settings.output_prefix, session_key, self.settings.output_extension
        ))
    }

    /// Reserve the output path for a session. Claiming again for the same
    /// session is a no-op.
    pub fn claim_output(&self, session_key: &str) -> Result<PathBuf, DispatchError> {
        let path = self.output_path(session_key);
        match self.claims.entry(self.claim_key(&path)) {
            Entry::Occupied(entry) if entry.get() != session_key => {
                Err(DispatchError::OutputCollision {
                    path,
                    claimed_by: entry.get().clone(),
                })
            }
            Entry::Occupied(_) => Ok(path),
            Entry::Vacant(entry) => {
                entry.insert(session_key.to_string());
                Ok(path)
            }
        }
    }

    fn claim_key(&self, path: &Path) -> String {
        let key = path.to_string_lossy();
        if self.settings.case_insensitive_outputs {
            key.to_ascii_lowercase()
        } else {
            key.into_owned()
        }
    }

    /// Merge one session. Exactly one backend run, no retries.
    pub fn dispatch(&self, session: &Session) -> MergeResult {
        let kind = self.backend.kind();

        if !session.is_merge_candidate() {
            debug!("Session '{}' is not a merge candidate", session.key);
            return MergeResult::skipped(&session.key, kind, SkipReason::NotACandidate);
        }
        if self.cancel.is_cancelled() {
            return MergeResult::skipped(&session.key, kind, SkipReason::Cancelled);
        }

        let output = match self.claim_output(&session.key) {
            Ok(output) => output,
            Err(err) => {
                error!("Session '{}': {}", session.key, err);
                return MergeResult::failed(&session.key, kind, err, Duration::ZERO);
            }
        };

        if output.exists() {
            if !self.settings.overwrite {
                warn!(
                    "Skipping session '{}': target {} exists",
                    session.key,
                    output.display()
                );
                return MergeResult::skipped(&session.key, kind, SkipReason::OutputExists);
            }
            info!("Overwriting preexisting file at {}", output.display());
        }

        let start = Instant::now();
        match self.run_backend(session, &output) {
            Ok(()) => {
                info!(
                    "Merged {} chapters of '{}' into {}",
                    session.chapters.len(),
                    session.key,
                    output.display()
                );
                MergeResult::succeeded(&session.key, kind, output, start.elapsed())
            }
            Err(err) => {
                error!("Merging session '{}' failed: {}", session.key, err);
                MergeResult::failed(&session.key, kind, err, start.elapsed())
            }
        }
    }

    fn run_backend(&self, session: &Session, output: &Path) -> Result<(), DispatchError> {
        let invocation = self.backend.invocation(&session.paths(), output)?;

        match process::run(&invocation, self.settings.timeout, &self.cancel) {
            Ok(outcome) => {
                if !outcome.stderr.trim().is_empty() {
                    debug!("{} stderr: {}", session.key, outcome.stderr.trim());
                }
                if output.is_file() {
                    Ok(())
                } else {
                    Err(DispatchError::MissingOutput(output.to_path_buf()))
                }
            }
            Err(err) => {
                // Nothing was written if the backend never started.
                if !matches!(
                    err,
                    DispatchError::BinaryNotFound(_) | DispatchError::Spawn { .. }
                ) {
                    remove_partial_output(output);
                }
                Err(err)
            }
        }
    }

    /// Merge many sessions on a pool of `parallelism` workers.
    ///
    /// Outputs are claimed in the given order before any work starts, so when
    /// two sessions map to the same file the later one fails no matter how
    /// the workers are scheduled. Results come back sorted by session key.
    pub fn dispatch_all(
        &self,
        sessions: &[Session],
        parallelism: usize,
        reporter: &dyn ProgressReporter,
    ) -> Vec<MergeResult> {
        let kind = self.backend.kind();
        reporter.on_merge_start(sessions.len());
        let start = Instant::now();

        // (scan position, result) so equal keys keep their scan order
        let mut results: Vec<(usize, MergeResult)> = Vec::with_capacity(sessions.len());
        let mut runnable: Vec<(usize, &Session)> = Vec::with_capacity(sessions.len());
        let mut seen_keys: HashSet<&str> = HashSet::new();
        for (position, session) in sessions.iter().enumerate() {
            if session.is_merge_candidate() {
                let claimed = if seen_keys.insert(session.key.as_str()) {
                    self.claim_output(&session.key)
                } else {
                    Err(DispatchError::OutputCollision {
                        path: self.output_path(&session.key),
                        claimed_by: session.key.clone(),
                    })
                };
                if let Err(err) = claimed {
                    error!("Session '{}': {}", session.key, err);
                    let result = MergeResult::failed(&session.key, kind, err, Duration::ZERO);
                    reporter.on_session_complete(&result);
                    results.push((position, result));
                    continue;
                }
            }
            runnable.push((position, session));
        }

        let run_one = |position: usize, session: &Session| {
            if !self.cancel.is_cancelled() {
                reporter.on_session_start(&session.key, session.chapters.len());
            }
            let result = self.dispatch(session);
            reporter.on_session_complete(&result);
            (position, result)
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism.max(1))
            .thread_name(|i| format!("merge-worker-{}", i))
            .build();
        let dispatched: Vec<(usize, MergeResult)> = match pool {
            Ok(pool) => pool.install(|| {
                runnable
                    .par_iter()
                    .map(|&(position, session)| run_one(position, session))
                    .collect()
            }),
            Err(err) => {
                warn!("Could not build worker pool ({}); merging sequentially", err);
                runnable
                    .iter()
                    .map(|&(position, session)| run_one(position, session))
                    .collect()
            }
        };

        results.extend(dispatched);
        results.sort_by(|(pa, a), (pb, b)| {
            a.session_key()
                .cmp(b.session_key())
                .then_with(|| pa.cmp(pb))
        });
        let results: Vec<MergeResult> = results.into_iter().map(|(_, result)| result).collect();
        reporter.on_merge_complete(&results, start.elapsed().as_secs_f64());
        results
    }
}

fn remove_partial_output(output: &Path) {
    match fs::remove_file(output) {
        Ok(()) => info!("Removed partial output {}", output.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => error!(
            "Could not remove partial output {}: {}",
            output.display(),
            err
        ),
    }
}
