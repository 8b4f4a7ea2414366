use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

use crate::cli::TopArgs;
use crate::error::HoggersError;
use crate::top::TopConfig;

pub const DEFAULT_REFRESH_SECS: u64 = 10;
pub const DEFAULT_ROWS_LIMIT: usize = 20;

/// Optional settings file. Every key falls back to a built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HoggersConfigFile {
    #[serde(default, alias = "refresh", alias = "interval")]
    pub refresh_secs: Option<u64>,
    #[serde(default, alias = "rows")]
    pub rows_limit: Option<usize>,
    #[serde(default)]
    pub keep_going: Option<bool>,
}

impl HoggersConfigFile {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("invalid settings file")
    }

    /// Loads `explicit` when given, otherwise the first discovered file.
    /// No file at all yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let Some(path) = explicit.map(Path::to_path_buf).or_else(discover_config_path) else {
            return Ok((Self::default(), None));
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let parsed = Self::parse(&raw)
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;
        Ok((parsed, Some(path)))
    }

    /// Flags win over the file, the file wins over defaults.
    pub fn top_config(&self, args: &TopArgs) -> TopConfig {
        let refresh_secs = args
            .interval
            .or(self.refresh_secs)
            .unwrap_or(DEFAULT_REFRESH_SECS)
            .max(1);
        let rows_limit = args
            .rows
            .or(self.rows_limit)
            .unwrap_or(DEFAULT_ROWS_LIMIT)
            .max(1);
        TopConfig {
            interval: Duration::from_secs(refresh_secs),
            rows_limit,
            keep_going: args.keep_going || self.keep_going.unwrap_or(false),
        }
    }
}

/// Splits a `--kubeconfig`/`$KUBECONFIG` value into its files. Absent or
/// blank input is a configuration error.
pub fn kubeconfig_paths(raw: Option<&str>) -> Result<Vec<PathBuf>, HoggersError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(HoggersError::MissingKubeconfig)?;
    let paths = std::env::split_paths(raw)
        .filter(|path| !path.as_os_str().is_empty())
        .collect::<Vec<_>>();
    if paths.is_empty() {
        return Err(HoggersError::MissingKubeconfig);
    }
    Ok(paths)
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("HOGGERS_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [PathBuf::from("hoggers.yaml"), PathBuf::from("hoggers.yml")];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/hoggers/config.yaml"),
            PathBuf::from(&home).join(".config/hoggers/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}
