//! Error types for debforge
//!
//! Domain-specific error types using thiserror.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Control file (`debian/control`) parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// Control file exists but cannot be read
    #[error("{path}: {error}")]
    Unreadable { path: String, error: String },

    /// Malformed deb822 syntax
    #[error("{path}:{line}: {message}")]
    Syntax {
        path: String,
        line: usize,
        message: String,
    },

    /// First paragraph has no `Source` field
    #[error("{path}: missing Source paragraph")]
    MissingSource { path: String },

    /// Binary paragraph has no `Package` field
    #[error("{path}:{line}: binary paragraph without Package field")]
    MissingPackage { path: String, line: usize },

    /// A relation field could not be parsed
    #[error("{path}:{line}: invalid {field} relation '{relation}'")]
    InvalidRelation {
        path: String,
        line: usize,
        field: String,
        relation: String,
    },
}

/// Relation string parse error (no file context)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid relation '{0}'")]
pub struct RelationError(pub String);

/// Metadata index errors
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Source root cannot be enumerated
    #[error("Failed to scan source directory '{path}': {error}")]
    Scan { path: PathBuf, error: String },

    /// Two units claim the same package name
    #[error("Package '{package}' is declared by both '{first}' and '{second}'")]
    DuplicatePackage {
        package: String,
        first: String,
        second: String,
    },
}

/// Dependency resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// Circular dependency detected
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
}

/// Per-unit build errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// The build ran and failed
    #[error("build for {unit} failed: {error}")]
    Failed { unit: String, error: String },

    /// Output capture for the unit could not be set up
    #[error("output capture for {unit} failed: {error}")]
    Output { unit: String, error: String },

    /// The build panicked
    #[error("build for {unit} panicked")]
    Panicked { unit: String },

    /// No container runtime available
    #[error("Neither Docker nor Podman found in PATH")]
    RuntimeNotFound,
}

impl BuildError {
    /// Name of the unit this error belongs to, if any
    pub fn unit(&self) -> Option<&str> {
        match self {
            Self::Failed { unit, .. } | Self::Output { unit, .. } | Self::Panicked { unit } => {
                Some(unit)
            }
            Self::RuntimeNotFound => None,
        }
    }
}

/// A failed unit and the reason it failed
#[derive(Debug)]
pub struct UnitFailure {
    /// Unit name
    pub unit: String,
    /// Underlying cause
    pub error: BuildError,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // BuildError variants already carry the unit name
        if self.error.unit() == Some(self.unit.as_str()) {
            write!(f, "{}", self.error)
        } else {
            write!(f, "build for {} failed: {}", self.unit, self.error)
        }
    }
}

/// Run-level build errors
#[derive(Error, Debug)]
pub enum RunError {
    /// One or more units failed
    #[error("{} build(s) failed:\n{}", failures.len(), join_lines(failures))]
    BuildsFailed { failures: Vec<UnitFailure> },

    /// The run was interrupted before every unit was attempted
    #[error("interrupted after {attempted} of {total} units ({} failed)", failures.len())]
    Interrupted {
        attempted: usize,
        total: usize,
        failures: Vec<UnitFailure>,
    },

    /// The worker thread died
    #[error("build worker terminated unexpectedly: {0}")]
    Worker(String),
}

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to clone repository
    #[error("Failed to clone '{url}': {error}")]
    CloneFailed { url: String, error: String },

    /// Ref is not a valid reference name
    #[error("Invalid ref '{reference}': {error}")]
    InvalidRef { reference: String, error: String },

    /// Destination already exists
    #[error("Destination '{path}' already exists")]
    DestinationExists { path: PathBuf },
}

/// Repository listing errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network error
    #[error("Failed to list repositories of '{org}': {error}")]
    ListFailed { org: String, error: String },

    /// Unexpected HTTP status
    #[error("Listing repositories of '{org}' returned HTTP {status}")]
    HttpStatus { org: String, status: u16 },
}

/// A repository that could not be cloned
#[derive(Debug)]
pub struct CloneFailure {
    /// Repository name
    pub repo: String,
    /// Underlying cause
    pub error: GitError,
}

impl fmt::Display for CloneFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clone for {} failed: {}", self.repo, self.error)
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },

    /// Invalid combination of settings
    #[error("{0}")]
    Invalid(String),
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to create or truncate a file
    #[error("Failed to create file '{path}': {error}")]
    CreateFile { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to make a path absolute
    #[error("Failed to resolve path '{path}': {error}")]
    ResolvePath { path: PathBuf, error: String },
}

/// Coarse classification of fatal and run-level errors
///
/// Unparseable metadata and unresolved dependencies never surface as
/// errors; they are recorded on the metadata index and dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Circular build dependency
    Cycle,
    /// One or more builds failed
    Build,
    /// One or more clones failed
    Clone,
    /// Configuration problem
    Config,
    /// Low-level I/O setup failure
    Io,
}

/// Top-level debforge error type
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Metadata index error
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Resolver error
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Build run error
    #[error("{0}")]
    Run(#[from] RunError),

    /// Repository listing error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Clone errors for one or more repositories
    #[error("{} clone(s) failed:\n{}", failures.len(), join_lines(failures))]
    ClonesFailed { failures: Vec<CloneFailure> },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),
}

impl ForgeError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Metadata(MetadataError::DuplicatePackage { .. }) | Self::Config(_) => {
                ErrorKind::Config
            }
            Self::Metadata(MetadataError::Scan { .. })
            | Self::Filesystem(_)
            | Self::Run(RunError::Worker(_)) => ErrorKind::Io,
            Self::Resolver(ResolverError::CircularDependency { .. }) => ErrorKind::Cycle,
            Self::Run(_) => ErrorKind::Build,
            Self::Source(_) | Self::ClonesFailed { .. } => ErrorKind::Clone,
        }
    }
}

fn join_lines<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
