use crate::config::BackendKind;
use crate::error::DispatchError;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Position of a chapter within its session.
///
/// Numeric indices compare by value, so `"001"` and `"1"` are equal.
/// Every numeric index sorts before every lexical one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChapterIndex {
    Numeric(u64),
    Lexical(String),
}

impl ChapterIndex {
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(value) = raw.parse::<u64>() {
                return ChapterIndex::Numeric(value);
            }
        }
        ChapterIndex::Lexical(raw.to_string())
    }
}

impl Ord for ChapterIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ChapterIndex::Numeric(a), ChapterIndex::Numeric(b)) => a.cmp(b),
            (ChapterIndex::Lexical(a), ChapterIndex::Lexical(b)) => a.cmp(b),
            (ChapterIndex::Numeric(_), ChapterIndex::Lexical(_)) => Ordering::Less,
            (ChapterIndex::Lexical(_), ChapterIndex::Numeric(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for ChapterIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ChapterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterIndex::Numeric(value) => write!(f, "{}", value),
            ChapterIndex::Lexical(value) => write!(f, "{}", value),
        }
    }
}

/// One file on disk that matched the filename pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterFile {
    pub path: PathBuf,
    pub session_key: String,
    pub chapter: ChapterIndex,
    /// Chapter text as it appeared in the file name.
    pub chapter_label: String,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
}

/// All chapters of one recording, ordered by chapter index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub key: String,
    pub chapters: Vec<ChapterFile>,
    pub ambiguous: bool,
    pub duplicate_indices: Vec<ChapterIndex>,
}

impl Session {
    pub fn is_merge_candidate(&self) -> bool {
        !self.ambiguous && self.chapters.len() >= 2
    }

    /// A single-chapter recording needs no merge.
    pub fn is_complete(&self) -> bool {
        !self.ambiguous && self.chapters.len() == 1
    }

    pub fn total_size(&self) -> u64 {
        self.chapters.iter().map(|c| c.size_bytes).sum()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.chapters.iter().map(|c| c.path.clone()).collect()
    }

    pub fn chapter_labels(&self) -> Vec<&str> {
        self.chapters.iter().map(|c| c.chapter_label.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MergeStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MergeStatus::Succeeded => "succeeded",
            MergeStatus::Failed => "failed",
            MergeStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The run was cancelled before this session started.
    Cancelled,
    /// The target file already exists and overwriting is disabled.
    OutputExists,
    /// Ambiguous or single-chapter session handed to the dispatcher.
    NotACandidate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipReason::Cancelled => "run cancelled",
            SkipReason::OutputExists => "output already exists",
            SkipReason::NotACandidate => "not a merge candidate",
        };
        f.write_str(label)
    }
}

/// Outcome of dispatching one session. Built only through the constructors
/// so that `output_path`, `error` and `skip_reason` line up with `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    session_key: String,
    status: MergeStatus,
    output_path: Option<PathBuf>,
    error: Option<DispatchError>,
    skip_reason: Option<SkipReason>,
    backend: BackendKind,
    duration: Duration,
}

impl MergeResult {
    pub fn succeeded(
        session_key: &str,
        backend: BackendKind,
        output_path: PathBuf,
        duration: Duration,
    ) -> Self {
        Self {
            session_key: session_key.to_string(),
            status: MergeStatus::Succeeded,
            output_path: Some(output_path),
            error: None,
            skip_reason: None,
            backend,
            duration,
        }
    }

    pub fn failed(
        session_key: &str,
        backend: BackendKind,
        error: DispatchError,
        duration: Duration,
    ) -> Self {
        Self {
            session_key: session_key.to_string(),
            status: MergeStatus::Failed,
            output_path: None,
            error: Some(error),
            skip_reason: None,
            backend,
            duration,
        }
    }

    pub fn skipped(session_key: &str, backend: BackendKind, reason: SkipReason) -> Self {
        Self {
            session_key: session_key.to_string(),
            status: MergeStatus::Skipped,
            output_path: None,
            error: None,
            skip_reason: Some(reason),
            backend,
            duration: Duration::ZERO,
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn status(&self) -> MergeStatus {
        self.status
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn error(&self) -> Option<&DispatchError> {
        self.error.as_ref()
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.skip_reason
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// Metadata could not be read (permission denied, vanished file, ...).
    Unreadable(String),
    /// The file name is not valid UTF-8 and cannot be matched.
    NonUtf8Name,
    /// The directory walker could not yield the entry.
    WalkError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWarning {
    pub path: PathBuf,
    pub kind: WarningKind,
}

impl fmt::Display for FileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::Unreadable(reason) => {
                write!(f, "{}: unreadable ({})", self.path.display(), reason)
            }
            WarningKind::NonUtf8Name => {
                write!(f, "{}: file name is not valid UTF-8", self.path.display())
            }
            WarningKind::WalkError(reason) => {
                write!(f, "{}: {}", self.path.display(), reason)
            }
        }
    }
}

/// Everything a scan of one directory produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub directory: PathBuf,
    /// Sessions in lexical order of their key.
    pub sessions: Vec<Session>,
    pub warnings: Vec<FileWarning>,
    /// Entries whose name did not match the pattern.
    pub unmatched: Vec<PathBuf>,
}

impl ScanOutcome {
    pub fn candidates(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter(|s| s.is_merge_candidate())
    }

    pub fn ambiguous(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter(|s| s.ambiguous)
    }

    pub fn complete(&self) -> impl Iterator<Item = &Session> {
        self.sessions.iter().filter(|s| s.is_complete())
    }

    pub fn chapter_count(&self) -> usize {
        self.sessions.iter().map(|s| s.chapters.len()).sum()
    }
}

/// The full output of a merge run, handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One result per dispatched session, sorted by session key.
    pub results: Vec<MergeResult>,
    pub ambiguous: Vec<Session>,
    pub complete: Vec<Session>,
    /// Candidate keys left out by the user's selection.
    pub deselected: Vec<String>,
    /// Selected keys that matched no candidate session.
    pub unknown_selection: Vec<String>,
    pub warnings: Vec<FileWarning>,
    pub duration: Duration,
}

impl RunReport {
    pub fn count(&self, status: MergeStatus) -> usize {
        self.results.iter().filter(|r| r.status() == status).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results
            .iter()
            .all(|r| r.status() == MergeStatus::Succeeded)
    }

    /// Every recording is now in one file: all merges succeeded and no
    /// ambiguous session was left for manual handling. Single-chapter
    /// sessions need nothing and do not count against it.
    pub fn fully_merged(&self) -> bool {
        self.all_succeeded() && self.ambiguous.is_empty()
    }
}
