//! Profiler configuration loaded from TOML with defaults for every field.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profiler::ClockSource;

/// Default guard against runaway recursion in the host VM.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading configuration from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown {field} '{value}'")]
    UnknownValue { field: &'static str, value: String },
}

/// How a finished profile is written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Nested `dict(...)` records.
    #[default]
    Dict,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Dict => f.write_str("dict"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dict" => Ok(OutputFormat::Dict),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::UnknownValue {
                field: "format",
                value: other.to_string(),
            }),
        }
    }
}

/// Settings for a profiled run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Clock used to time call paths.
    pub clock: ClockSource,
    /// Output format of the finished profile.
    pub format: OutputFormat,
    /// Destination file; stdout when absent.
    pub output: Option<PathBuf>,
    /// Deepest VM call nesting before the run aborts.
    pub max_call_depth: usize,
    /// Emit `profile = ` ahead of the dict record.
    pub assignment_prefix: bool,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            clock: ClockSource::default(),
            format: OutputFormat::default(),
            output: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            assignment_prefix: true,
        }
    }
}

impl ProfilerConfig {
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(data)?)
    }

    /// Load configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&data)?;
        tracing::debug!(path = %path.display(), ?config, "loaded profiler configuration");
        Ok(config)
    }
}
