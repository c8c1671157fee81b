use crate::model::{ChapterFile, Session};
use std::collections::BTreeMap;
use tracing::warn;

/// Group chapter files into sessions.
///
/// Sessions come back in lexical key order and chapters in ascending index
/// order (ties broken by path). A repeated chapter index marks the session
/// ambiguous.
pub fn group_chapters(files: Vec<ChapterFile>) -> Vec<Session> {
    let mut by_key: BTreeMap<String, Vec<ChapterFile>> = BTreeMap::new();
    for file in files {
        by_key.entry(file.session_key.clone()).or_default().push(file);
    }

    by_key
        .into_iter()
        .map(|(key, mut chapters)| {
            chapters.sort_by(|a, b| a.chapter.cmp(&b.chapter).then_with(|| a.path.cmp(&b.path)));

            let mut duplicate_indices = Vec::new();
            for pair in chapters.windows(2) {
                if pair[0].chapter == pair[1].chapter
                    && duplicate_indices.last() != Some(&pair[1].chapter)
                {
                    duplicate_indices.push(pair[1].chapter.clone());
                }
            }

            let ambiguous = !duplicate_indices.is_empty();
            if ambiguous {
                warn!(
                    "Session '{}' has duplicate chapter indices {:?}; excluded from merging",
                    key,
                    duplicate_indices
                        .iter()
                        .map(|i| i.to_string())
                        .collect::<Vec<_>>()
                );
            }

            Session {
                key,
                chapters,
                ambiguous,
                duplicate_indices,
            }
        })
        .collect()
}
