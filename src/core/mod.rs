//! Core business logic module
//!
//! # Submodules
//!
//! - [`control`] - `debian/control` parsing
//! - [`metadata`] - Package name to unit index
//! - [`graph`] - Dependency graph and base tiers
//! - [`resolver`] - Build order computation
//! - [`builder`] - Sequential build orchestration
//! - [`clone`] - Cloning an organisation's repositories
//! - [`config`] - Layered configuration

pub mod builder;
pub mod clone;
pub mod config;
pub mod control;
pub mod graph;
pub mod metadata;
pub mod resolver;
