//! Container-based unit builds using Docker or Podman
//!
//! The package directory is mounted at `/build` and the unit's source at
//! `/build/<unit>`. Debian tooling writes artifacts to the parent of the
//! source tree, so built packages land in the package directory, where
//! later units can pick them up.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::defaults;
use crate::core::builder::BuildOperation;
use crate::error::BuildError;
use crate::infra::filesystem;
use crate::infra::tee::UnitOutput;

/// Container runtime type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRuntime {
    /// Docker container runtime
    Docker,
    /// Podman container runtime
    Podman,
}

impl ContainerRuntime {
    /// Get the command name for this runtime
    pub fn command(&self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }

    /// Find an installed runtime, preferring Docker
    pub fn detect() -> Option<Self> {
        [Self::Docker, Self::Podman]
            .into_iter()
            .find(|runtime| which::which(runtime.command()).is_ok())
    }
}

/// Mount configuration for container volumes
#[derive(Debug, Clone, PartialEq)]
pub struct MountConfig {
    /// Host path to mount
    pub host_path: PathBuf,
    /// Container path to mount to
    pub container_path: PathBuf,
}

impl MountConfig {
    fn to_arg(&self) -> String {
        format!(
            "-v={}:{}",
            self.host_path.display(),
            self.container_path.display()
        )
    }
}

/// Settings shared by every unit build
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerBuildConfig {
    /// Image name without tag
    pub image: String,
    /// Distribution version, used as the image tag
    pub version: String,
    /// Use the local image only, never pull
    pub local: bool,
    /// Directory holding one subdirectory per unit
    pub source_root: PathBuf,
    /// Directory receiving built packages
    pub package_dir: PathBuf,
    /// Command run in the unit directory
    pub command: Vec<String>,
}

impl ContainerBuildConfig {
    /// Config with the default image, version and command
    pub fn new(source_root: impl Into<PathBuf>, package_dir: impl Into<PathBuf>) -> Self {
        Self {
            image: defaults::DEFAULT_IMAGE.to_string(),
            version: defaults::DEFAULT_VERSION.to_string(),
            local: false,
            source_root: source_root.into(),
            package_dir: package_dir.into(),
            command: defaults::DEFAULT_BUILD_COMMAND
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Fully qualified image reference
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.version)
    }
}

/// Builds each unit in a fresh container
#[derive(Debug, Clone)]
pub struct ContainerBuild {
    runtime: ContainerRuntime,
    config: ContainerBuildConfig,
}

impl ContainerBuild {
    /// Create a container build with an explicit runtime
    pub fn new(runtime: ContainerRuntime, config: ContainerBuildConfig) -> Self {
        Self { runtime, config }
    }

    /// Create a container build using whichever runtime is installed
    pub fn detect(config: ContainerBuildConfig) -> Result<Self, BuildError> {
        let runtime = ContainerRuntime::detect().ok_or(BuildError::RuntimeNotFound)?;
        tracing::debug!("using container runtime {}", runtime.command());
        Ok(Self::new(runtime, config))
    }

    /// Get the runtime
    pub fn runtime(&self) -> ContainerRuntime {
        self.runtime
    }

    /// Get the configuration
    pub fn config(&self) -> &ContainerBuildConfig {
        &self.config
    }

    fn mounts(unit: &str, source_root: &Path, package_dir: &Path) -> Vec<MountConfig> {
        let root = PathBuf::from(defaults::CONTAINER_BUILD_ROOT);
        vec![
            MountConfig {
                host_path: package_dir.to_path_buf(),
                container_path: root.clone(),
            },
            MountConfig {
                host_path: source_root.join(unit),
                container_path: root.join(unit),
            },
        ]
    }

    /// Arguments passed to the runtime to build `unit`
    ///
    /// Host paths are used as given; [`BuildOperation::build`] makes them
    /// absolute first.
    pub fn run_args(&self, unit: &str) -> Vec<String> {
        self.args_with(unit, &self.config.source_root, &self.config.package_dir)
    }

    fn args_with(&self, unit: &str, source_root: &Path, package_dir: &Path) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];

        if self.config.local {
            args.push("--pull=never".to_string());
        }

        for mount in Self::mounts(unit, source_root, package_dir) {
            args.push(mount.to_arg());
        }

        let workdir = Path::new(defaults::CONTAINER_BUILD_ROOT).join(unit);
        args.push(format!("-w={}", workdir.display()));

        args.push(self.config.image_ref());
        args.extend(self.config.command.iter().cloned());
        args
    }
}

impl BuildOperation for ContainerBuild {
    fn build(&self, unit: &str, output: &mut UnitOutput) -> Result<(), BuildError> {
        let failed = |error: String| BuildError::Failed {
            unit: unit.to_string(),
            error,
        };

        let source_root = filesystem::absolute(&self.config.source_root)
            .map_err(|e| failed(e.to_string()))?;
        let package_dir = filesystem::absolute(&self.config.package_dir)
            .map_err(|e| failed(e.to_string()))?;
        if !source_root.join(unit).is_dir() {
            return Err(failed(format!(
                "source directory '{}' does not exist",
                source_root.join(unit).display()
            )));
        }

        let args = self.args_with(unit, &source_root, &package_dir);
        tracing::debug!("{} {}", self.runtime.command(), args.join(" "));

        let stdio_failed = |e: std::io::Error| BuildError::Output {
            unit: unit.to_string(),
            error: e.to_string(),
        };
        let status = Command::new(self.runtime.command())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(output.stdio().map_err(stdio_failed)?)
            .stderr(output.stdio().map_err(stdio_failed)?)
            .status()
            .map_err(|e| failed(format!("could not run {}: {e}", self.runtime.command())))?;

        if status.success() {
            Ok(())
        } else {
            Err(failed(format!("{} exited with {status}", self.runtime.command())))
        }
    }
}
