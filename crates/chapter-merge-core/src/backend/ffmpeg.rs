use super::{Invocation, MergeBackend};
use crate::config::BackendKind;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// ffmpeg with the concat demuxer, stream copy, and unknown (telemetry)
/// streams carried over.
pub struct FfmpegConcat {
    binary: PathBuf,
}

impl FfmpegConcat {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl MergeBackend for FfmpegConcat {
    fn kind(&self) -> BackendKind {
        BackendKind::Primary
    }

    fn binary(&self) -> &Path {
        &self.binary
    }

    fn invocation(&self, inputs: &[PathBuf], output: &Path) -> io::Result<Invocation> {
        let mut list = tempfile::Builder::new()
            .prefix("chapter-merge-")
            .suffix(".txt")
            .tempfile()?;
        write_concat_list(&mut list, inputs)?;

        Ok(Invocation::new(&self.binary)
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"])
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(list.path())
            .args(["-c", "copy"])
            .args(["-map", "0:v", "-map", "0:a?", "-map", "0:d?"])
            .arg("-copy_unknown")
            .arg(output)
            .keep(list))
    }
}

/// One `file '<path>'` line per input, in order.
fn write_concat_list(list: &mut NamedTempFile, inputs: &[PathBuf]) -> io::Result<()> {
    for input in inputs {
        writeln!(list, "file '{}'", escape_concat_path(input))?;
    }
    list.flush()
}

/// The concat demuxer ends a quoted string at `'`; close, escape, reopen.
fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}
