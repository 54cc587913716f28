use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::activity::{DEFAULT_CONTEXT, DEFAULT_GROUPING_WINDOW_MS};
use crate::error::ErrorCode;
use crate::fuzzy::DEFAULT_MIN_SCORE;
use crate::model::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityConfig {
    /// Maximum gap between compatible items kept in one group.
    #[serde(default = "default_grouping_window")]
    pub grouping_window_ms: Timestamp,
    /// Context lines around each hunk of an edit-group diff.
    #[serde(default = "default_diff_context")]
    pub diff_context: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            grouping_window_ms: default_grouping_window(),
            diff_context: default_diff_context(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentsConfig {
    #[serde(default = "default_fuzzy_min_score")]
    pub fuzzy_min_score: f64,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            fuzzy_min_score: default_fuzzy_min_score(),
        }
    }
}

/// Project-local config path under `root`.
#[must_use]
pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(".rewind/config.toml")
}

/// Per-user config path, if the platform has a config directory.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rewind/config.toml"))
}

/// Read and parse one config file.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a valid config.
pub fn load_config_file(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<EngineConfig>(&content)
        .with_context(|| {
            format!(
                "{}: Failed to parse {}",
                ErrorCode::ConfigParseError,
                path.display()
            )
        })
}

/// Resolve the effective config: the project file if present, else the user
/// file, else defaults. Files are not merged.
///
/// # Errors
///
/// Fails if the selected file cannot be read or parsed.
pub fn load_config(root: &Path) -> Result<EngineConfig> {
    let project = project_config_path(root);
    if project.exists() {
        tracing::debug!(path = %project.display(), "using project config");
        return load_config_file(&project);
    }

    if let Some(user) = user_config_path().filter(|p| p.exists()) {
        tracing::debug!(path = %user.display(), "using user config");
        return load_config_file(&user);
    }

    Ok(EngineConfig::default())
}

const fn default_grouping_window() -> Timestamp {
    DEFAULT_GROUPING_WINDOW_MS
}

const fn default_diff_context() -> usize {
    DEFAULT_CONTEXT
}

const fn default_fuzzy_min_score() -> f64 {
    DEFAULT_MIN_SCORE
}
