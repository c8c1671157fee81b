mod group;
mod pattern;
mod walk;

pub use group::group_chapters;
pub use pattern::{FilenamePattern, PatternMatch, PRESETS};
pub use walk::scan;
