//! Platform-specific directory management
//!
//! Locates the user configuration directory. `DEBFORGE_CONFIG_DIR`
//! overrides the platform default.

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the config directory
pub const ENV_CONFIG_DIR: &str = "DEBFORGE_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "debforge";

/// Name of the user-level config file
const CONFIG_FILE: &str = "config.toml";

/// Platform-specific directory provider for debforge
#[derive(Debug, Clone)]
pub struct ForgeDirs {
    config_dir: PathBuf,
}

impl ForgeDirs {
    /// Resolve directories from the environment, then platform defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
        }
    }

    /// Use an explicit config directory
    #[must_use]
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/debforge` or `~/.config/debforge`
    /// - macOS: `~/Library/Application Support/debforge`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Path of the user-level `config.toml`
    #[must_use]
    pub fn user_config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }
}

impl Default for ForgeDirs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_new_creates_instance() {
        let dirs = ForgeDirs::new();
        assert!(!dirs.config_dir().as_os_str().is_empty());
    }

    #[test]
    fn test_user_config_path_is_under_config_dir() {
        let dirs = ForgeDirs::with_config_dir("/etc/debforge-test");
        assert_eq!(
            dirs.user_config_path(),
            PathBuf::from("/etc/debforge-test/config.toml")
        );
    }
}
