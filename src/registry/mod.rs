//! Remote repository sources
//!
//! Enumerates the repositories to clone from a hosting service.

pub mod github;

pub use github::{GitHubOrg, RemoteRepository, RepositorySource};
