//! Debforge - build order resolver for Debian source repositories
//!
//! Given a directory of checked-out source units, each with a
//! `debian/control` file, this library computes an order in which the units
//! can be built so that every unit comes after the units producing its
//! build dependencies, and builds them one after another in a container.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Metadata, dependency graph, resolution and build orchestration
//! - [`registry`] - Remote repository listing
//! - [`infra`] - Infrastructure layer (git, containers, filesystem, output capture)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod registry;

#[cfg(test)]
pub mod test_utils;
