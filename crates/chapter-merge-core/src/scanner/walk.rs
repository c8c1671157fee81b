use super::group::group_chapters;
use super::pattern::FilenamePattern;
use crate::error::Error;
use crate::model::{ChapterFile, ChapterIndex, FileWarning, ScanOutcome, WarningKind};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Scan one flat directory for chapter files and group them into sessions.
///
/// Only a missing or unreadable directory is an error. Problems with
/// individual entries become warnings and the entry is left out.
pub fn scan(directory: &Path, pattern: &FilenamePattern) -> Result<ScanOutcome, Error> {
    let directory = open_directory(directory)?;
    debug!(
        "Scanning {} with pattern '{}'",
        directory.display(),
        pattern
    );

    let mut files: Vec<ChapterFile> = Vec::new();
    let mut warnings: Vec<FileWarning> = Vec::new();
    let mut unmatched: Vec<PathBuf> = Vec::new();

    let walker = WalkDir::new(&directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| directory.clone());
                warn!("Error reading entry {}: {}", path.display(), err);
                warnings.push(FileWarning {
                    path,
                    kind: WarningKind::WalkError(err.to_string()),
                });
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path().to_path_buf();
        let Some(name) = entry.file_name().to_str() else {
            warn!("Skipping {}: file name is not valid UTF-8", path.display());
            warnings.push(FileWarning {
                path,
                kind: WarningKind::NonUtf8Name,
            });
            continue;
        };

        let Some(found) = pattern.match_name(name) else {
            debug!("Ignoring {}: does not match pattern", name);
            unmatched.push(path);
            continue;
        };

        // Follows symlinks, so a dangling link shows up here as unreadable.
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("Error getting metadata for {}: {}", path.display(), err);
                warnings.push(FileWarning {
                    path,
                    kind: WarningKind::Unreadable(err.to_string()),
                });
                continue;
            }
        };
        if metadata.is_dir() {
            continue;
        }

        files.push(ChapterFile {
            chapter: ChapterIndex::parse(&found.chapter_label),
            chapter_label: found.chapter_label,
            session_key: found.session_key,
            size_bytes: metadata.len(),
            modified: metadata.modified().ok(),
            path,
        });
    }

    let matched = files.len();
    let sessions = group_chapters(files);
    info!(
        "Found {} chapter files in {} sessions ({} unmatched, {} warnings)",
        matched,
        sessions.len(),
        unmatched.len(),
        warnings.len()
    );

    Ok(ScanOutcome {
        directory,
        sessions,
        warnings,
        unmatched,
    })
}

/// Check the directory exists and can be listed; return its canonical path.
fn open_directory(directory: &Path) -> Result<PathBuf, Error> {
    let metadata = fs::metadata(directory).map_err(|err| classify(directory, err))?;
    if !metadata.is_dir() {
        return Err(Error::NotADirectory(directory.to_path_buf()));
    }
    fs::read_dir(directory).map_err(|err| classify(directory, err))?;
    fs::canonicalize(directory).map_err(|err| classify(directory, err))
}

fn classify(directory: &Path, err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::NotFound => Error::DirectoryNotFound(directory.to_path_buf()),
        io::ErrorKind::PermissionDenied => Error::PermissionDenied(directory.to_path_buf()),
        _ => Error::Io(io::Error::new(
            err.kind(),
            format!("Error reading directory {}: {}", directory.display(), err),
        )),
    }
}
