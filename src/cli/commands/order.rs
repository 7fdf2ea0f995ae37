//! Build order computation
//!
//! Scans the source directory, prints the resulting order, and hands it on
//! to the build stage.

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::output::{status, OutputConfig};
use crate::core::config::Settings;
use crate::core::resolver::BuildPlan;

/// Compute and print the build order
pub fn execute(settings: &Settings, output: &OutputConfig) -> Result<BuildPlan> {
    let plan = BuildPlan::from_directory(&settings.src_dir, &settings.base_tiers)
        .with_context(|| {
            format!(
                "Failed to compute build order for {}",
                settings.src_dir.display()
            )
        })?;

    for dep in plan.graph.unresolved() {
        tracing::info!("{} build-depends on {}, not built here", dep.unit, dep.package);
    }

    if output.json {
        let unparseable: Vec<_> = plan
            .index
            .unparseable()
            .iter()
            .map(|u| json!({ "unit": u.name, "error": u.error.to_string() }))
            .collect();
        let doc = json!({
            "count": plan.order.len(),
            "order": plan.order.iter().collect::<Vec<_>>(),
            "resolved": plan.order.resolved(),
            "deferred": plan.order.deferred(),
            "unparseable": unparseable,
        });
        println!("{doc}");
    } else if !output.quiet {
        println!("Build order ({} repos): {}", plan.order.len(), plan.order);
        if !plan.order.deferred().is_empty() {
            println!(
                "{} {} unit(s) with unparseable metadata are built last",
                status::WARNING,
                plan.order.deferred().len()
            );
        }
    }

    Ok(plan)
}
