// RON config file loading

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{ConfigError, Settings};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/ltc_timecode.ron";
pub const APP_DIR: &str = "ltc_timecode";
pub const USER_CONFIG_FILE: &str = "config.ron";

/// Candidate files in lookup order: system-wide, then per-user
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(APP_DIR).join(USER_CONFIG_FILE));
    }
    paths
}

/// Parses one file; fields it omits keep their defaults
pub fn load_file(path: &Path) -> Result<Settings, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::Io(e),
    })?;

    ron::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Loads the explicit file if given (it must exist), otherwise the first
/// default candidate that exists, otherwise built-in defaults.
pub fn load_settings(explicit: Option<&Path>) -> Result<(Settings, Option<PathBuf>), ConfigError> {
    if let Some(path) = explicit {
        let settings = load_file(path)?;
        info!(path = %path.display(), "Loaded config");
        return Ok((settings, Some(path.to_path_buf())));
    }

    for path in default_config_paths() {
        if path.is_file() {
            let settings = load_file(&path)?;
            info!(path = %path.display(), "Loaded config");
            return Ok((settings, Some(path)));
        }
        debug!(path = %path.display(), "No config file");
    }

    Ok((Settings::default(), None))
}
