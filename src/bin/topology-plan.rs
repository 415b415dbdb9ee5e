// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Planner CLI
//!
//! Reads a topology document, plans it, reports conflicts and writes the plan
//! as JSON.
//!
//! Run with: cargo run --bin topology-plan -- topologies/expense-tracker.json
//!
//! Configuration (see `PlannerConfig`):
//! 1. `TOPOLOGY_INPUT` or the first argument: document to plan
//! 2. `TOPOLOGY_OUTPUT`: plan destination (stdout when unset)
//! 3. `TOPOLOGY_ALLOW_CONFLICTS`: write the plan even when conflicts are found

use anyhow::{bail, Context, Result};
use topology_planner::{run_document, PlannerConfig, TopologyDocument};
use tracing::{error, info};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = PlannerConfig::from_env().context("Failed to load configuration")?;
    info!("📋 Configuration loaded:");
    info!("  - Input: {}", config.input.display());
    match &config.output {
        Some(path) => info!("  - Output: {}", path.display()),
        None => info!("  - Output: stdout"),
    }
    info!("  - Allow conflicts: {}", config.allow_conflicts);

    let raw = std::fs::read_to_string(&config.input)
        .with_context(|| format!("Failed to read {}", config.input.display()))?;
    let document = TopologyDocument::from_json(&raw)
        .with_context(|| format!("Failed to parse {}", config.input.display()))?;

    let outcome = run_document(&document).context("Planning failed")?;

    for conflict in &outcome.conflicts {
        error!("❌ {}", conflict);
    }
    if !outcome.is_clean() && !config.allow_conflicts {
        bail!(
            "{} conflict(s) found; set TOPOLOGY_ALLOW_CONFLICTS=true to emit anyway",
            outcome.conflicts.len()
        );
    }

    let json = outcome
        .serialized
        .stamped()
        .to_json()
        .context("Failed to serialize plan")?;

    match &config.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("✅ Plan written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
