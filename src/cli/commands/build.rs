//! Build command implementation
//!
//! Builds every unit of the order in a container, one after another, until
//! done or interrupted with Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::output::{status, OutputConfig};
use crate::core::builder::{BuildOrchestrator, RunState};
use crate::core::config::Settings;
use crate::core::resolver::BuildOrder;
use crate::error::ForgeError;
use crate::infra::container::ContainerBuild;
use crate::infra::filesystem;

/// Execute the build command
pub async fn execute(settings: &Settings, order: BuildOrder, output: &OutputConfig) -> Result<()> {
    filesystem::create_dir_all(&settings.log_dir).context("Failed to create log directory")?;
    filesystem::create_dir_all(&settings.pkg_dir)
        .context("Failed to create package directory")?;

    let operation = ContainerBuild::detect(settings.container_config())?;
    tracing::info!(
        "building {} units with {}",
        order.len(),
        settings.container_config().image_ref()
    );

    let mut orchestrator = BuildOrchestrator::new(order, &settings.log_dir).with_echo(output.human());
    let report = orchestrator
        .run(Arc::new(operation), interrupt_signal())
        .await?;

    if output.json {
        let failed: Vec<_> = report
            .failures
            .iter()
            .map(|f| json!({ "unit": f.unit, "error": f.to_string() }))
            .collect();
        println!(
            "{}",
            json!({
                "status": report.status,
                "total": report.total,
                "attempted": report.attempted,
                "failed": failed,
            })
        );
    } else if !output.quiet {
        match report.status {
            RunState::Interrupted => println!(
                "{} interrupted after {} of {} units",
                status::WARNING,
                report.attempted.len(),
                report.total
            ),
            _ if report.succeeded() => {
                println!("{} built {} units", status::SUCCESS, report.total);
            }
            _ => {}
        }
    }

    report
        .into_result()
        .map_err(ForgeError::from)
        .with_context(|| {
            format!(
                "Build run incomplete (failed units are listed in {})",
                orchestrator.failure_log_path().display()
            )
        })
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
