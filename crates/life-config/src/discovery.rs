//! Config file discovery and loading.
//!
//! Resolution order (first existing file wins):
//! 1. An explicit path (`--config` / `LIFE_CONFIG`), which must exist
//! 2. `~/life.yml`
//! 3. `./life.yml`

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::validation::validate_config;
use crate::{ConfigError, LifeConfig, Result};

/// Default config filename.
pub const CONFIG_FILE: &str = "life.yml";

/// A loaded config with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: LifeConfig,
    pub path: PathBuf,
    /// Structural warnings found while loading.
    pub warnings: Vec<String>,
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Candidate locations, in lookup order.
pub fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    candidates_in(explicit, dirs::home_dir().as_deref(), &cwd)
}

fn candidates_in(explicit: Option<&Path>, home: Option<&Path>, cwd: &Path) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![expand_path(&path.to_string_lossy())];
    }

    let mut paths = Vec::new();
    if let Some(home) = home {
        paths.push(home.join(CONFIG_FILE));
    }
    paths.push(cwd.join(CONFIG_FILE));
    paths
}

fn first_existing(candidates: Vec<PathBuf>) -> Result<PathBuf> {
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => Ok(path.clone()),
        None => Err(ConfigError::NotFound { tried: candidates }),
    }
}

/// Locate the config file.
pub fn discover_config(explicit: Option<&Path>) -> Result<PathBuf> {
    first_existing(candidate_paths(explicit))
}

/// Discover and load the config file.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = discover_config(explicit)?;
    load_config_file(&path)
}

/// Load config from a specific file path (no discovery).
///
/// Structural problems are returned as warnings and logged; only unreadable
/// files and YAML that doesn't fit the config model are errors.
pub fn load_config_file(path: &Path) -> Result<LoadedConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let parse_error = |e: serde_yaml::Error| ConfigError::ParseYaml {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let raw: Option<serde_yaml::Value> = serde_yaml::from_str(&contents).map_err(parse_error)?;
    let raw = raw.unwrap_or(serde_yaml::Value::Null);

    let warnings = validate_config(&raw);
    if !warnings.is_empty() {
        warn!("Configuration validation warnings:");
        for issue in &warnings {
            warn!("  - {}", issue);
        }
    }

    let mut config: LifeConfig = match raw {
        serde_yaml::Value::Null => LifeConfig::default(),
        raw => serde_yaml::from_value(raw).map_err(parse_error)?,
    };
    if let Some(ws) = &config.workspace {
        config.workspace = Some(expand_path(ws).to_string_lossy().into_owned());
    }

    debug!(path = %path.display(), "loaded config");

    Ok(LoadedConfig {
        config,
        path: path.to_path_buf(),
        warnings,
    })
}
