//! Console status prefixes

/// Success prefix (green checkmark)
pub const SUCCESS: &str = "✓";

/// Error prefix (red X)
pub const ERROR: &str = "✗";

/// Warning prefix (yellow triangle)
pub const WARNING: &str = "⚠";

/// Info prefix (blue circle)
pub const INFO: &str = "ℹ";
