// Copyright (c) 2025 - Cowboy AI, Inc.
//! Planning pipeline
//!
//! ```text
//! TopologyModel → allocate → derive → route → check → emit
//! ```
//!
//! Capacity and validation failures abort the run. Conflicts do not: the
//! plan is still produced, emitted with an `unvalidated` warning, and the
//! conflicts are handed back for the caller to report.

use tracing::info;

use crate::checker::{validate, Conflict};
use crate::document::TopologyDocument;
use crate::errors::PlannerResult;
use crate::plan::{emit, emit_validated, Plan, SerializedPlan};
use crate::topology::TopologyModel;

/// Everything one planning run produced
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: Plan,
    pub conflicts: Vec<Conflict>,
    pub serialized: SerializedPlan,
}

impl PlanOutcome {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Plan, check and emit `model`
pub fn run(model: &TopologyModel) -> PlannerResult<PlanOutcome> {
    let plan = Plan::build(model)?;

    let (serialized, conflicts) = match validate(&plan) {
        Ok(validated) => (emit_validated(&validated), Vec::new()),
        Err(conflicts) => (emit(&plan), conflicts),
    };

    info!(
        "Planning run finished: {} rules, {} routes, {} conflicts",
        plan.rules.len(),
        plan.routes.len(),
        conflicts.len()
    );

    Ok(PlanOutcome {
        plan,
        conflicts,
        serialized,
    })
}

/// Replay `document` into a model and plan it
pub fn run_document(document: &TopologyDocument) -> PlannerResult<PlanOutcome> {
    let model = document.to_model()?;
    run(&model)
}
