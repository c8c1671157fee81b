//! Merge backends: external programs that concatenate an ordered list of
//! media files into one file while keeping their metadata streams.
//!
//! A backend only knows how to build its command line. Running it, timing it
//! out and cancelling it is the job of [`process::run`].

mod ffmpeg;
mod mp4merge;
pub mod process;

pub use ffmpeg::FfmpegConcat;
pub use mp4merge::Mp4Merge;

use crate::config::{BackendKind, BinariesConfig};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A ready-to-run command line.
#[derive(Debug)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Files the command reads; removed when the invocation is dropped.
    pub scratch: Vec<NamedTempFile>,
}

impl Invocation {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn keep(mut self, file: NamedTempFile) -> Self {
        self.scratch.push(file);
        self
    }
}

/// Capability: merge ordered files into one output, preserving every
/// embedded metadata stream.
pub trait MergeBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn binary(&self) -> &Path;

    fn invocation(&self, inputs: &[PathBuf], output: &Path) -> io::Result<Invocation>;
}

/// Pick the backend named by configuration. Never falls back on its own.
pub fn backend_for(kind: BackendKind, binaries: &BinariesConfig) -> Box<dyn MergeBackend> {
    let binary = binaries.path_for(kind).to_path_buf();
    match kind {
        BackendKind::Primary => Box::new(FfmpegConcat::new(binary)),
        BackendKind::Fallback => Box::new(Mp4Merge::new(binary)),
    }
}
