pub mod backend;
pub mod cancel;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod model;
pub mod progress;
pub mod scanner;
pub mod selection;

pub use cancel::CancelFlag;
pub use config::{AppConfig, BackendKind};
pub use dispatch::{DispatchSettings, Dispatcher};
pub use engine::MergeEngine;
pub use error::{DispatchError, Error};
pub use model::{
    ChapterFile, ChapterIndex, FileWarning, MergeResult, MergeStatus, RunReport, ScanOutcome,
    Session, SkipReason, WarningKind,
};
pub use progress::{ProgressReporter, SilentReporter};
pub use selection::Selection;
