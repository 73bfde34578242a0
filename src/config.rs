//! Configuration for predup.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (PREDUP_HOME, PREDUP_TARGET_THRESHOLD, PREDUP_TIMEFRAME_THRESHOLD)
//! 2. Config file (.predup/config.yaml)
//! 3. Defaults (~/.predup, thresholds 0.96)
//!
//! Config file discovery:
//! - Searches current directory and parents for .predup/config.yaml
//! - Paths in config file are relative to the .predup/ directory
//!
//! Only batch callers read these thresholds. `compare_predictions` always
//! uses the fixed 0.96.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::dedup::{Thresholds, DUPLICATE_THRESHOLD};
use crate::domain::DEFAULT_MIN_SPAN_LEN;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub thresholds: Option<ThresholdsConfig>,
    #[serde(default)]
    pub validation: Option<ValidationConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .predup/)
    pub home: Option<String>,
    /// Relation log file (relative to .predup/)
    pub relations: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdsConfig {
    pub target: Option<f64>,
    pub timeframe: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    pub min_span_len: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to predup home (state)
    pub home: PathBuf,
    /// Relation log location
    pub relations: PathBuf,
    /// Duplicate thresholds for batch runs
    pub thresholds: Thresholds,
    /// Shortest span accepted by validation
    pub min_span_len: usize,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".predup").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Read a threshold override from the environment
fn env_threshold(var: &str) -> Result<Option<f64>> {
    match std::env::var(var) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid {}: {}", var, raw))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

/// Build a config from an optional parsed file plus the environment
fn resolve(
    config_path: Option<&Path>,
    config: Option<ConfigFile>,
    default_home: PathBuf,
) -> Result<ResolvedConfig> {
    let predup_dir = config_path
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let paths = config
        .as_ref()
        .map(|c| c.paths.clone())
        .unwrap_or_default();

    let home = if let Ok(env_home) = std::env::var("PREDUP_HOME") {
        PathBuf::from(env_home)
    } else if let Some(ref home_path) = paths.home {
        resolve_path(predup_dir, home_path)
    } else {
        default_home
    };

    let relations = match paths.relations {
        Some(ref rel_path) => resolve_path(predup_dir, rel_path),
        None => home.join("relations.jsonl"),
    };

    let file_thresholds = config.as_ref().and_then(|c| c.thresholds.as_ref());
    let thresholds = Thresholds {
        target: env_threshold("PREDUP_TARGET_THRESHOLD")?
            .or_else(|| file_thresholds.and_then(|t| t.target))
            .unwrap_or(DUPLICATE_THRESHOLD),
        timeframe: env_threshold("PREDUP_TIMEFRAME_THRESHOLD")?
            .or_else(|| file_thresholds.and_then(|t| t.timeframe))
            .unwrap_or(DUPLICATE_THRESHOLD),
    };

    if !thresholds.is_valid() {
        anyhow::bail!(
            "Thresholds must be within [0, 1] (target: {}, timeframe: {})",
            thresholds.target,
            thresholds.timeframe
        );
    }

    let min_span_len = config
        .as_ref()
        .and_then(|c| c.validation.as_ref())
        .and_then(|v| v.min_span_len)
        .unwrap_or(DEFAULT_MIN_SPAN_LEN);

    Ok(ResolvedConfig {
        home,
        relations,
        thresholds,
        min_span_len,
        config_file: config_path.map(Path::to_path_buf),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".predup");

    let config_path = find_config_file();
    let config = match config_path {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    resolve(config_path.as_deref(), config, default_home)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the relation log path ($PREDUP_HOME/relations.jsonl by default)
pub fn relations_path() -> Result<PathBuf> {
    Ok(config()?.relations.clone())
}

/// Get the batch duplicate thresholds
pub fn thresholds() -> Result<Thresholds> {
    Ok(config()?.thresholds)
}
