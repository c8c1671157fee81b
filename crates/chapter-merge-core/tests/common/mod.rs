#![allow(dead_code)]

use chapter_merge_core::{ChapterFile, ChapterIndex, Session};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes every input path, one per line, to the file after `--out`.
pub const MERGE_OK: &str = r#"#!/bin/sh
out=""
next_is_out=0
for arg in "$@"; do
  if [ "$next_is_out" = 1 ]; then out="$arg"; next_is_out=0; continue; fi
  if [ "$arg" = "--out" ]; then next_is_out=1; fi
done
: > "$out"
for arg in "$@"; do
  [ "$arg" = "--out" ] && break
  echo "$arg" >> "$out"
done
"#;

/// Leaves a partial file behind, complains on stderr and exits 3.
pub const MERGE_FAIL: &str = r#"#!/bin/sh
for arg in "$@"; do out="$arg"; done
echo partial > "$out"
echo "boom: corrupt chapter" >&2
exit 3
"#;

/// Starts writing, then hangs.
pub const MERGE_HANG: &str = r#"#!/bin/sh
for arg in "$@"; do out="$arg"; done
echo partial > "$out"
exec sleep 30
"#;

/// Exits 0 without writing anything.
pub const MERGE_NOTHING: &str = "#!/bin/sh\nexit 0\n";

#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    let mut permissions = fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).unwrap();
    path
}

/// Create empty-ish chapter files with distinct sizes.
pub fn touch_all(dir: &Path, names: &[&str]) {
    for (i, name) in names.iter().enumerate() {
        fs::write(dir.join(name), vec![0u8; 16 * (i + 1)]).unwrap();
    }
}

/// A session of real files under `dir`, named `<key>_<NNN>.MP4`.
pub fn make_session(dir: &Path, key: &str, chapters: usize) -> Session {
    let chapters = (1..=chapters)
        .map(|i| {
            let label = format!("{:03}", i);
            let path = dir.join(format!("{}_{}.MP4", key, label));
            fs::write(&path, format!("{} chapter {}", key, i)).unwrap();
            ChapterFile {
                size_bytes: fs::metadata(&path).unwrap().len(),
                path,
                session_key: key.to_string(),
                chapter: ChapterIndex::parse(&label),
                chapter_label: label,
                modified: None,
            }
        })
        .collect();

    Session {
        key: key.to_string(),
        chapters,
        ambiguous: false,
        duplicate_indices: Vec::new(),
    }
}
