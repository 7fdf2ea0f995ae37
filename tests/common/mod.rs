//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test workspace context
///
/// Creates a temporary directory laid out like a debforge working
/// directory (`src/`, `pkg/`, `log/`) and provides utilities for setting up
/// test scenarios.
pub struct TestProject {
    /// Temporary directory for the test workspace
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test workspace in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test workspace directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test workspace
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test workspace
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Create a unit under `src/` with the given control file
    pub fn create_unit(&self, name: &str, control: &str) {
        self.create_file(&format!("src/{name}/debian/control"), control);
    }

    /// Check if a file exists in the test workspace
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test workspace
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run debforge in the workspace, isolated from user configuration
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_debforge"))
            .current_dir(self.path())
            .env("DEBFORGE_CONFIG_DIR", self.path().join(".config"))
            .env_remove("GITHUB_TOKEN")
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .expect("Failed to execute debforge")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Control file for a unit producing `packages` and build-depending on `deps`
pub fn control(source: &str, deps: &str, packages: &[&str]) -> String {
    let mut text = format!("Source: {source}\nMaintainer: Test <test@example.com>\n");
    if !deps.is_empty() {
        text.push_str(&format!("Build-Depends: {deps}\n"));
    }
    for package in packages {
        text.push_str(&format!("\nPackage: {package}\nArchitecture: any\n"));
    }
    text
}

/// Control file whose Build-Depends field does not parse
pub const MALFORMED_CONTROL: &str = "Source: broken\nBuild-Depends: good, (>= 1.0)\n\nPackage: broken\n";
