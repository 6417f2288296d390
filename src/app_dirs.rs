//! Where the implicit preparation config lives.
//!
//! `<config root>/.clipprep/config.toml`, with the root taken from
//! `CLIPPREP_CONFIG_HOME` when set and the platform config directory otherwise.

use std::{ffi::OsString, path::PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// Application directory under the config root.
pub const APP_DIR_NAME: &str = ".clipprep";
/// File name of the preparation config inside the application directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Environment variable overriding the config root.
pub const CONFIG_HOME_ENV: &str = "CLIPPREP_CONFIG_HOME";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No config directory available; set CLIPPREP_CONFIG_HOME or pass --config")]
    NoBaseDir,
}

/// Default location of `config.toml`. Nothing is created on disk.
pub fn default_config_path() -> Result<PathBuf, AppDirError> {
    let platform = BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf());
    let root = config_root(std::env::var_os(CONFIG_HOME_ENV), platform)
        .ok_or(AppDirError::NoBaseDir)?;
    Ok(root.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// An empty override counts as unset.
fn config_root(env_override: Option<OsString>, platform: Option<PathBuf>) -> Option<PathBuf> {
    env_override
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or(platform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_platform_dir() {
        let root = config_root(
            Some(OsString::from("/data/jobs/42")),
            Some(PathBuf::from("/home/u/.config")),
        );
        assert_eq!(root, Some(PathBuf::from("/data/jobs/42")));
    }

    #[test]
    fn empty_override_falls_back_to_platform_dir() {
        let root = config_root(Some(OsString::new()), Some(PathBuf::from("/home/u/.config")));
        assert_eq!(root, Some(PathBuf::from("/home/u/.config")));
        assert_eq!(config_root(None, None), None);
    }

    #[test]
    fn default_config_path_ends_in_app_dir_config() {
        if let Ok(path) = default_config_path() {
            assert!(path.ends_with(PathBuf::from(APP_DIR_NAME).join(CONFIG_FILE_NAME)));
        }
    }
}
