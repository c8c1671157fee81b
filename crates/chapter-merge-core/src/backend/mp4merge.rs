use super::{Invocation, MergeBackend};
use crate::config::BackendKind;
use std::io;
use std::path::{Path, PathBuf};

/// `mp4merge <inputs>... --out <output>`
pub struct Mp4Merge {
    binary: PathBuf,
}

impl Mp4Merge {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl MergeBackend for Mp4Merge {
    fn kind(&self) -> BackendKind {
        BackendKind::Fallback
    }

    fn binary(&self) -> &Path {
        &self.binary
    }

    fn invocation(&self, inputs: &[PathBuf], output: &Path) -> io::Result<Invocation> {
        Ok(Invocation::new(&self.binary)
            .args(inputs)
            .arg("--out")
            .arg(output))
    }
}
