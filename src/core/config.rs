//! Layered configuration
//!
//! Settings come from built-in defaults, then a TOML file, then command-line
//! flags, each layer overriding the previous one. The file is the first of:
//!
//! 1. the path given with `--config` (must exist)
//! 2. `./debforge.toml`
//! 3. `config.toml` in the user config directory
//!
//! Relative paths in the file are taken relative to the working directory,
//! like the equivalent flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{defaults, urls};
use crate::core::graph::BaseTiers;
use crate::error::ConfigError;
use crate::infra::container::ContainerBuildConfig;
use crate::infra::dirs::ForgeDirs;

/// Contents of a debforge config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgeConfig {
    /// Directory layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Container build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Repository cloning settings
    #[serde(default)]
    pub clone: CloneConfig,

    /// Build order settings
    #[serde(default)]
    pub order: OrderConfig,
}

/// Directory layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Source root, one unit per subdirectory
    pub src: Option<PathBuf>,

    /// Built package directory
    pub pkg: Option<PathBuf>,

    /// Build log directory
    pub log: Option<PathBuf>,
}

/// Container build settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Image name without tag
    pub image: Option<String>,

    /// Target distribution version (image tag)
    pub version: Option<String>,

    /// Never pull the image
    pub local: Option<bool>,

    /// Command run inside the container
    pub command: Option<Vec<String>>,
}

/// Repository cloning settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloneConfig {
    /// GitHub organisation
    pub org: Option<String>,

    /// Branch or tag to check out
    #[serde(rename = "ref")]
    pub reference: Option<String>,

    /// GitHub API endpoint
    pub api_url: Option<String>,
}

/// Build order settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderConfig {
    /// Base unit tiers, lowest first
    pub base_tiers: Option<BaseTiers>,
}

impl ForgeConfig {
    /// Load configuration from a specific path
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Find and load the config file
    pub fn discover(
        explicit: Option<&Path>,
        cwd: &Path,
        dirs: &ForgeDirs,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::ReadError {
                    path: path.display().to_string(),
                    error: "file not found".to_string(),
                });
            }
            tracing::debug!("using config {}", path.display());
            return Self::load_from_path(path);
        }

        let project = cwd.join(defaults::PROJECT_CONFIG_FILE);
        let path = if project.is_file() {
            project
        } else {
            dirs.user_config_path()
        };
        tracing::debug!("looking for config at {}", path.display());
        Self::load_from_path(&path)
    }
}

/// Values given on the command line, if any
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--src`
    pub src: Option<PathBuf>,
    /// `--pkg`
    pub pkg: Option<PathBuf>,
    /// `--log`
    pub log: Option<PathBuf>,
    /// `--image-name`
    pub image: Option<String>,
    /// `--target-version`
    pub version: Option<String>,
    /// `--local`; a flag can only switch it on
    pub local: bool,
    /// `--ref`
    pub reference: Option<String>,
    /// `--org`
    pub org: Option<String>,
    /// GitHub API token
    pub github_token: Option<String>,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Source root
    pub src_dir: PathBuf,
    /// Built package directory
    pub pkg_dir: PathBuf,
    /// Build log directory
    pub log_dir: PathBuf,
    /// Image name without tag
    pub image: String,
    /// Image tag
    pub version: String,
    /// Never pull the image
    pub local: bool,
    /// Command run inside the container
    pub build_command: Vec<String>,
    /// GitHub organisation to clone
    pub org: String,
    /// Ref to clone, required only when cloning
    pub reference: Option<String>,
    /// GitHub API endpoint
    pub api_url: String,
    /// GitHub API token
    pub github_token: Option<String>,
    /// Base unit tiers
    pub base_tiers: BaseTiers,
}

impl Settings {
    /// Merge defaults, `config` and `overrides`
    pub fn resolve(config: &ForgeConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let build_command = config.build.command.clone().unwrap_or_else(|| {
            defaults::DEFAULT_BUILD_COMMAND
                .iter()
                .map(ToString::to_string)
                .collect()
        });
        if build_command.is_empty() {
            return Err(ConfigError::Invalid(
                "build.command must not be empty".to_string(),
            ));
        }

        let pick_path = |flag: Option<PathBuf>, file: &Option<PathBuf>, default: &str| {
            flag.or_else(|| file.clone())
                .unwrap_or_else(|| PathBuf::from(default))
        };
        let pick = |flag: Option<String>, file: &Option<String>, default: &str| {
            flag.or_else(|| file.clone())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            src_dir: pick_path(overrides.src, &config.paths.src, defaults::DEFAULT_SRC_DIR),
            pkg_dir: pick_path(overrides.pkg, &config.paths.pkg, defaults::DEFAULT_PKG_DIR),
            log_dir: pick_path(overrides.log, &config.paths.log, defaults::DEFAULT_LOG_DIR),
            image: pick(overrides.image, &config.build.image, defaults::DEFAULT_IMAGE),
            version: pick(overrides.version, &config.build.version, defaults::DEFAULT_VERSION),
            local: overrides.local || config.build.local.unwrap_or(false),
            build_command,
            org: pick(overrides.org, &config.clone.org, defaults::DEFAULT_ORG),
            reference: overrides
                .reference
                .or_else(|| config.clone.reference.clone())
                .filter(|r| !r.is_empty()),
            api_url: config
                .clone
                .api_url
                .clone()
                .unwrap_or_else(|| urls::GITHUB_API.to_string()),
            github_token: overrides.github_token.filter(|t| !t.is_empty()),
            base_tiers: config.order.base_tiers.clone().unwrap_or_default(),
        })
    }

    /// The ref to clone at; cloning without one is refused
    pub fn clone_reference(&self) -> Result<&str, ConfigError> {
        self.reference
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid("Must supply git ref to clone (--ref)".to_string()))
    }

    /// Container build settings for these paths and image
    pub fn container_config(&self) -> ContainerBuildConfig {
        ContainerBuildConfig {
            image: self.image.clone(),
            version: self.version.clone(),
            local: self.local,
            source_root: self.src_dir.clone(),
            package_dir: self.pkg_dir.clone(),
            command: self.build_command.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(config: &ForgeConfig, overrides: Overrides) -> Settings {
        Settings::resolve(config, overrides).unwrap()
    }

    #[test]
    fn test_defaults() {
        let s = settings(&ForgeConfig::default(), Overrides::default());
        assert_eq!(s.src_dir, PathBuf::from("src"));
        assert_eq!(s.pkg_dir, PathBuf::from("pkg"));
        assert_eq!(s.log_dir, PathBuf::from("log"));
        assert_eq!(s.image, "jsouthworth/danos-buildpackage");
        assert_eq!(s.version, "debian10-bootstrap");
        assert!(!s.local);
        assert_eq!(s.org, "danos");
        assert_eq!(s.reference, None);
        assert_eq!(s.api_url, "https://api.github.com");
        assert_eq!(s.base_tiers, BaseTiers::default());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = ForgeConfig::load_from_path(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ForgeConfig::default());
    }

    #[test]
    fn test_load_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let content = r#"
[paths]
src = "/srv/danos/src"

[build]
version = "debian10"
local = true
command = ["sh", "-c", "apt-get build-dep -y . && dpkg-buildpackage -b"]

[clone]
ref = "1908"

[order]
base_tiers = [["base-files"], ["linux-vyatta"]]
"#;
        fs::write(&config_path, content).unwrap();

        let config = ForgeConfig::load_from_path(&config_path).unwrap();
        assert_eq!(config.paths.src, Some(PathBuf::from("/srv/danos/src")));
        assert_eq!(config.clone.reference.as_deref(), Some("1908"));

        let s = settings(&config, Overrides::default());
        assert_eq!(s.version, "debian10");
        assert!(s.local);
        assert_eq!(s.build_command[0], "sh");
        assert_eq!(s.reference.as_deref(), Some("1908"));
        assert_eq!(
            s.base_tiers,
            BaseTiers::new(vec![vec!["base-files".into()], vec!["linux-vyatta".into()]])
        );
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid toml [[[").unwrap();

        let result = ForgeConfig::load_from_path(&config_path);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[build]\nimag = \"typo\"\n").unwrap();

        assert!(ForgeConfig::load_from_path(&config_path).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let config = ForgeConfig {
            paths: PathsConfig {
                src: Some("from-file".into()),
                pkg: Some("pkg-file".into()),
                log: None,
            },
            build: BuildConfig {
                image: Some("file/image".into()),
                local: Some(false),
                ..BuildConfig::default()
            },
            clone: CloneConfig {
                org: Some("file-org".into()),
                reference: Some("file-ref".into()),
                api_url: None,
            },
            order: OrderConfig::default(),
        };
        let overrides = Overrides {
            src: Some("from-flag".into()),
            image: Some("flag/image".into()),
            local: true,
            reference: Some("flag-ref".into()),
            ..Overrides::default()
        };

        let s = settings(&config, overrides);
        assert_eq!(s.src_dir, PathBuf::from("from-flag"));
        assert_eq!(s.pkg_dir, PathBuf::from("pkg-file"));
        assert_eq!(s.log_dir, PathBuf::from("log"));
        assert_eq!(s.image, "flag/image");
        assert!(s.local);
        assert_eq!(s.org, "file-org");
        assert_eq!(s.reference.as_deref(), Some("flag-ref"));
    }

    #[test]
    fn test_clone_requires_ref() {
        let s = settings(&ForgeConfig::default(), Overrides::default());
        let err = s.clone_reference().unwrap_err();
        assert!(err.to_string().contains("Must supply git ref"));

        let empty = settings(
            &ForgeConfig::default(),
            Overrides {
                reference: Some(String::new()),
                ..Overrides::default()
            },
        );
        assert!(empty.clone_reference().is_err());
    }

    #[test]
    fn test_empty_build_command_is_invalid() {
        let config = ForgeConfig {
            build: BuildConfig {
                command: Some(Vec::new()),
                ..BuildConfig::default()
            },
            ..ForgeConfig::default()
        };
        assert!(matches!(
            Settings::resolve(&config, Overrides::default()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_discover_prefers_project_file() {
        let temp = TempDir::new().unwrap();
        let user = temp.path().join("user");
        fs::create_dir(&user).unwrap();
        fs::write(user.join("config.toml"), "[clone]\norg = \"user-org\"\n").unwrap();
        let dirs = ForgeDirs::with_config_dir(&user);

        let from_user = ForgeConfig::discover(None, temp.path(), &dirs).unwrap();
        assert_eq!(from_user.clone.org.as_deref(), Some("user-org"));

        fs::write(temp.path().join("debforge.toml"), "[clone]\norg = \"project-org\"\n").unwrap();
        let from_project = ForgeConfig::discover(None, temp.path(), &dirs).unwrap();
        assert_eq!(from_project.clone.org.as_deref(), Some("project-org"));
    }

    #[test]
    fn test_discover_explicit_must_exist() {
        let temp = TempDir::new().unwrap();
        let dirs = ForgeDirs::with_config_dir(temp.path());
        let missing = temp.path().join("nope.toml");

        let err = ForgeConfig::discover(Some(&missing), temp.path(), &dirs).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_container_config_follows_settings() {
        let s = settings(
            &ForgeConfig::default(),
            Overrides {
                version: Some("debian11".into()),
                local: true,
                ..Overrides::default()
            },
        );
        let c = s.container_config();
        assert_eq!(c.image_ref(), "jsouthworth/danos-buildpackage:debian11");
        assert!(c.local);
        assert_eq!(c.source_root, PathBuf::from("src"));
    }
}
