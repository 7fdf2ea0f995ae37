//! Output formatting and progress indicators
//!
//! Console conventions shared by all commands: status prefixes, progress
//! indicators, the log level derived from `-v`/`-q`, and error display.

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{ForgeError, RunError};

pub use crate::infra::status;

/// Exit status used when a build run was interrupted
pub const EXIT_INTERRUPTED: i32 = 130;

/// Console preferences from the global flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Only errors
    pub quiet: bool,
    /// Machine-readable results on stdout
    pub json: bool,
    /// `-v` count
    pub verbose: u8,
}

impl OutputConfig {
    /// Create from the global flags
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Default tracing directive when `RUST_LOG` is unset
    pub fn log_directive(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        }
    }

    /// Whether human-oriented progress and unit output go to stdout
    pub fn human(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str, output: &OutputConfig) -> ProgressBar {
    if !output.human() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Create a progress bar for cloning repositories
pub fn create_clone_bar(total: u64, output: &OutputConfig) -> ProgressBar {
    if !output.human() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} repositories ({msg})")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░"),
    );
    pb
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error, output: &OutputConfig) {
    if output.json {
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        eprintln!(
            "{}",
            serde_json::json!({ "error": error.to_string(), "causes": causes })
        );
        return;
    }

    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Process exit status for a failed invocation
pub fn exit_code(error: &anyhow::Error) -> i32 {
    let interrupted = error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<ForgeError>(),
            Some(ForgeError::Run(RunError::Interrupted { .. }))
        ) || matches!(
            cause.downcast_ref::<RunError>(),
            Some(RunError::Interrupted { .. })
        )
    });
    if interrupted {
        EXIT_INTERRUPTED
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directive_follows_flags() {
        assert_eq!(OutputConfig::new(false, false, 0).log_directive(), "warn");
        assert_eq!(OutputConfig::new(false, false, 1).log_directive(), "info");
        assert_eq!(OutputConfig::new(false, false, 3).log_directive(), "debug");
        assert_eq!(OutputConfig::new(true, false, 2).log_directive(), "error");
    }

    #[test]
    fn test_json_and_quiet_are_not_human() {
        assert!(OutputConfig::default().human());
        assert!(!OutputConfig::new(true, false, 0).human());
        assert!(!OutputConfig::new(false, true, 0).human());
    }

    #[test]
    fn test_exit_code_for_interrupt() {
        let interrupted = anyhow::Error::new(RunError::Interrupted {
            attempted: 1,
            total: 3,
            failures: vec![],
        })
        .context("build run incomplete");
        assert_eq!(exit_code(&interrupted), EXIT_INTERRUPTED);

        let failed = anyhow::Error::new(ForgeError::from(RunError::BuildsFailed {
            failures: vec![],
        }));
        assert_eq!(exit_code(&failed), 1);
    }
}
