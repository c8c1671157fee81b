use crate::error::Error;
use crate::scanner::FilenamePattern;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CHAPTER_MERGE";

/// Which configured merge binary to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// General purpose codec tool (ffmpeg) driven by a concat list.
    #[serde(alias = "ffmpeg")]
    Primary,
    /// Dedicated metadata-preserving MP4 merger (mp4-merge).
    #[serde(alias = "mp4merge")]
    Fallback,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Primary => "primary",
            BackendKind::Fallback => "fallback",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" | "ffmpeg" => Ok(BackendKind::Primary),
            "fallback" | "mp4merge" => Ok(BackendKind::Fallback),
            other => Err(format!(
                "unknown backend '{}' (expected primary, fallback, ffmpeg or mp4merge)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinariesConfig {
    pub primary_path: PathBuf,
    pub fallback_path: PathBuf,
}

impl BinariesConfig {
    pub fn path_for(&self, kind: BackendKind) -> &Path {
        match kind {
            BackendKind::Primary => &self.primary_path,
            BackendKind::Fallback => &self.fallback_path,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub binaries: BinariesConfig,
    pub backend: BackendKind,
    pub output_directory: PathBuf,
    /// Preset name or template, see `FilenamePattern`.
    pub filename_pattern: String,
    pub parallelism: usize,
    /// `None` or `Some(0)` means merges may run as long as they need.
    #[serde(default)]
    pub per_merge_timeout_seconds: Option<u64>,
    pub overwrite: bool,
    /// Treat output paths differing only in ASCII case as the same file.
    /// Leave on for case-insensitive file systems (macOS, Windows, FAT cards).
    pub case_insensitive_outputs: bool,
    pub output_prefix: String,
    pub output_extension: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            binaries: BinariesConfig {
                primary_path: PathBuf::from("ffmpeg"),
                fallback_path: PathBuf::from("mp4merge"),
            },
            backend: BackendKind::Primary,
            output_directory: PathBuf::from("./merged"),
            filename_pattern: "default".to_string(),
            parallelism: 1,
            per_merge_timeout_seconds: None,
            overwrite: false,
            case_insensitive_outputs: true,
            output_prefix: "concatenated".to_string(),
            output_extension: "mp4".to_string(),
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Option<Duration> {
        match self.per_merge_timeout_seconds {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }

    pub fn pattern(&self) -> Result<FilenamePattern, Error> {
        FilenamePattern::from_config(&self.filename_pattern)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.parallelism == 0 {
            return Err(Error::Other("parallelism must be at least 1".to_string()));
        }
        if self.output_prefix.trim().is_empty() {
            return Err(Error::Other("output_prefix must not be empty".to_string()));
        }
        if self.output_extension.trim().is_empty() {
            return Err(Error::Other(
                "output_extension must not be empty".to_string(),
            ));
        }
        self.pattern()?;
        Ok(())
    }
}

/// Load configuration from defaults, an optional `Config.toml` (or the given
/// file, which must then exist) and `CHAPTER_MERGE__*` environment variables.
pub fn load_configuration(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();

    let file_source = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };

    let builder = Config::builder()
        .set_default(
            "binaries.primary_path",
            defaults.binaries.primary_path.to_string_lossy().into_owned(),
        )?
        .set_default(
            "binaries.fallback_path",
            defaults.binaries.fallback_path.to_string_lossy().into_owned(),
        )?
        .set_default("backend", defaults.backend.as_str())?
        .set_default(
            "output_directory",
            defaults.output_directory.to_string_lossy().into_owned(),
        )?
        .set_default("filename_pattern", defaults.filename_pattern)?
        .set_default("parallelism", defaults.parallelism as u64)?
        .set_default("overwrite", defaults.overwrite)?
        .set_default(
            "case_insensitive_outputs",
            defaults.case_insensitive_outputs,
        )?
        .set_default("output_prefix", defaults.output_prefix)?
        .set_default("output_extension", defaults.output_extension)?
        .add_source(file_source)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    builder.try_deserialize::<AppConfig>()
}
