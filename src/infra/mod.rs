//! Infrastructure layer
//!
//! Handles all I/O operations: network, filesystem, and external processes.

pub mod container;
pub mod dirs;
pub mod filesystem;
pub mod git;
pub mod status;
pub mod tee;
