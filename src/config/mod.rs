//! Configuration and constants
//!
//! - [`defaults`] - Default paths, image and base units
//! - [`urls`] - Remote service URLs

pub mod defaults;
pub mod urls;
