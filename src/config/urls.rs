//! Remote service URLs

/// GitHub REST API base URL
pub const GITHUB_API: &str = "https://api.github.com";
