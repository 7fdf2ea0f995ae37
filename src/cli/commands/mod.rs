//! CLI command implementations
//!
//! Each stage of a run is implemented in its own submodule.

pub mod build;
pub mod clone;
pub mod order;
