//! Default configuration values

/// Default directory holding one checked-out unit per subdirectory
pub const DEFAULT_SRC_DIR: &str = "src";

/// Default directory receiving built packages
pub const DEFAULT_PKG_DIR: &str = "pkg";

/// Default directory receiving per-unit build logs
pub const DEFAULT_LOG_DIR: &str = "log";

/// Default container image used to build units
pub const DEFAULT_IMAGE: &str = "jsouthworth/danos-buildpackage";

/// Default distribution version (image tag) to build for
pub const DEFAULT_VERSION: &str = "debian10-bootstrap";

/// Default GitHub organisation to clone from
pub const DEFAULT_ORG: &str = "danos";

/// Name of the aggregate failure log inside the log directory
pub const FAILED_BUILDS_LOG: &str = "failed-builds.log";

/// Extension of per-unit build logs
pub const UNIT_LOG_EXTENSION: &str = "log";

/// Repositories requested per page when listing an organisation
pub const REPOS_PER_PAGE: u32 = 100;

/// Base units every other unit is built after, lowest tier first
///
/// The kernel sits in its own tier: its packaging metadata cannot be
/// resolved reliably, so it is simply built before everything else.
pub const DEFAULT_BASE_TIERS: &[&[&str]] = &[
    &["base-files", "lintian-profile-vyatta"],
    &["linux-vyatta"],
];

/// Name of the project-local config file
pub const PROJECT_CONFIG_FILE: &str = "debforge.toml";

/// Command run inside the build container, in the unit's directory
pub const DEFAULT_BUILD_COMMAND: &[&str] = &["dpkg-buildpackage", "-us", "-uc", "-b"];

/// Mount point of the package directory inside the build container
pub const CONTAINER_BUILD_ROOT: &str = "/build";
