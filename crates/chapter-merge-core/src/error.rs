use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal errors. Any of these aborts the run before (or instead of) dispatch.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Permission denied reading directory: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid filename pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the directory-level failures raised by a scan.
    pub fn is_scan_error(&self) -> bool {
        matches!(
            self,
            Error::DirectoryNotFound(_) | Error::PermissionDenied(_) | Error::NotADirectory(_)
        )
    }
}

/// Per-session merge failure. Recorded on the session's result, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("backend exited with {}: {}", exit_label(.code), .stderr.trim())]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("merge timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("backend binary not found: {}", .0.display())]
    BinaryNotFound(PathBuf),

    #[error("failed to start backend {}: {reason}", .binary.display())]
    Spawn { binary: PathBuf, reason: String },

    #[error("merge cancelled")]
    Cancelled,

    #[error("output {} already claimed by session '{claimed_by}'", .path.display())]
    OutputCollision { path: PathBuf, claimed_by: String },

    #[error("backend reported success but produced no file at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::Io(err.to_string())
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "signal".to_string(),
    }
}
