//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::core::config::{ForgeConfig, Overrides, Settings};
use crate::infra::dirs::ForgeDirs;
use output::OutputConfig;

/// Debforge - build a distribution from many Debian source repositories
///
/// Prints the order in which the units under the source directory must be
/// built. With `--clone` the units are first cloned from a GitHub
/// organisation; with `--build` they are then built in that order.
#[derive(Parser, Debug)]
#[command(name = "debforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Clone every repository of the organisation first
    #[arg(long)]
    pub clone: bool,

    /// Build the units instead of only printing the order
    #[arg(long)]
    pub build: bool,

    /// Directory holding one unit per subdirectory [default: src]
    #[arg(long, value_name = "DIR")]
    pub src: Option<PathBuf>,

    /// Directory receiving built packages [default: pkg]
    #[arg(long, value_name = "DIR")]
    pub pkg: Option<PathBuf>,

    /// Directory receiving build logs [default: log]
    #[arg(long, value_name = "DIR")]
    pub log: Option<PathBuf>,

    /// Build container image name
    #[arg(long, value_name = "IMAGE")]
    pub image_name: Option<String>,

    /// Distribution version to build for (image tag)
    #[arg(long, value_name = "VERSION")]
    pub target_version: Option<String>,

    /// Only use a locally available image
    #[arg(long)]
    pub local: bool,

    /// Branch or tag to clone
    #[arg(long = "ref", value_name = "REF")]
    pub reference: Option<String>,

    /// GitHub organisation to clone [default: danos]
    #[arg(long, value_name = "ORG")]
    pub org: Option<String>,

    /// Token for the GitHub API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Config file to use instead of the discovered one
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Console preferences from the global flags
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig::new(self.quiet, self.json, self.verbose)
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            src: self.src.clone(),
            pkg: self.pkg.clone(),
            log: self.log.clone(),
            image: self.image_name.clone(),
            version: self.target_version.clone(),
            local: self.local,
            reference: self.reference.clone(),
            org: self.org.clone(),
            github_token: self.github_token.clone(),
        }
    }

    /// Resolve settings from config file and flags
    pub fn settings(&self) -> Result<Settings> {
        let cwd = std::env::current_dir().context("Failed to determine working directory")?;
        let config = ForgeConfig::discover(self.config.as_deref(), &cwd, &ForgeDirs::new())?;
        Ok(Settings::resolve(&config, self.overrides())?)
    }

    /// Clone, order and build as requested
    pub async fn run(self) -> Result<()> {
        let output = self.output_config();
        let settings = self.settings()?;

        if self.clone {
            commands::clone::execute(&settings, &output).await?;
        }

        let plan = commands::order::execute(&settings, &output)?;

        if self.build {
            commands::build::execute(&settings, plan.order, &output).await?;
        }

        Ok(())
    }
}
