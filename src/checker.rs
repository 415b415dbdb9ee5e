// Copyright (c) 2025 - Cowboy AI, Inc.
//! Conflict Checker
//!
//! Validates a plan exhaustively. Every problem found is reported, each
//! tagged with a kind and the entities involved, so a caller can fix them
//! all in one pass.
//!
//! | Kind | Meaning |
//! |------|---------|
//! | `subnet-overlap` | two subnets of one network share addresses |
//! | `subnet-out-of-bounds` | a subnet is not strictly inside its network |
//! | `dangling-selector` | a rule names subnets absent from the plan, or none |
//! | `contradictory-rules` | same selectors, port and protocol, opposite effects |
//! | `unplaced-service` | a service has no placement subnets |
//! | `unexposed-port` | an allow rule targets a port the service does not expose |
//! | `cross-network` | a rule connects endpoints in different networks |
//! | `visibility-mismatch` | a public service has no public placement subnet |

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{info, warn};

use crate::domain::{Port, Protocol};
use crate::plan::Plan;
use crate::rules::{AccessRule, Selector};
use crate::topology::Effect;

/// Category of a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    SubnetOverlap,
    SubnetOutOfBounds,
    DanglingSelector,
    ContradictoryRules,
    UnplacedService,
    UnexposedPort,
    CrossNetwork,
    VisibilityMismatch,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::SubnetOverlap => "subnet-overlap",
            ConflictKind::SubnetOutOfBounds => "subnet-out-of-bounds",
            ConflictKind::DanglingSelector => "dangling-selector",
            ConflictKind::ContradictoryRules => "contradictory-rules",
            ConflictKind::UnplacedService => "unplaced-service",
            ConflictKind::UnexposedPort => "unexposed-port",
            ConflictKind::CrossNetwork => "cross-network",
            ConflictKind::VisibilityMismatch => "visibility-mismatch",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A non-fatal problem found in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    /// Names of the offending subnets, services, networks or rules
    pub entities: Vec<String>,
    pub detail: String,
}

impl Conflict {
    fn new(kind: ConflictKind, entities: Vec<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            entities,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.entities.join(", "), self.detail)
    }
}

/// A plan the checker found no conflicts in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPlan(Plan);

impl ValidatedPlan {
    pub fn plan(&self) -> &Plan {
        &self.0
    }
}

/// Check `plan`, returning it as validated when it is consistent
pub fn validate(plan: &Plan) -> Result<ValidatedPlan, Vec<Conflict>> {
    let conflicts = check(plan);
    if conflicts.is_empty() {
        Ok(ValidatedPlan(plan.clone()))
    } else {
        Err(conflicts)
    }
}

/// Report every conflict in `plan`; empty when it is consistent
pub fn check(plan: &Plan) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    check_subnets(plan, &mut conflicts);
    check_services(plan, &mut conflicts);
    check_selectors(plan, &mut conflicts);
    check_contradictions(&plan.rules, &mut conflicts);
    check_ports(plan, &mut conflicts);
    check_networks(plan, &mut conflicts);

    for conflict in &conflicts {
        warn!("Plan conflict {}", conflict);
    }
    info!(
        "Checked plan: {} subnets, {} services, {} rules, {} conflicts",
        plan.subnets.len(),
        plan.services.len(),
        plan.rules.len(),
        conflicts.len()
    );
    conflicts
}

// ============================================================================
// Subnets
// ============================================================================

fn check_subnets(plan: &Plan, conflicts: &mut Vec<Conflict>) {
    for subnet in &plan.subnets {
        match plan.network(subnet.network.as_str()) {
            Some(network) if network.cidr.strictly_contains(&subnet.cidr) => {}
            Some(network) => conflicts.push(Conflict::new(
                ConflictKind::SubnetOutOfBounds,
                vec![subnet.label.to_string(), network.name.to_string()],
                format!(
                    "{} is not strictly inside {}",
                    subnet.cidr, network.cidr
                ),
            )),
            None => conflicts.push(Conflict::new(
                ConflictKind::SubnetOutOfBounds,
                vec![subnet.label.to_string(), subnet.network.to_string()],
                format!("network {} is not in the plan", subnet.network),
            )),
        }
    }

    for (i, a) in plan.subnets.iter().enumerate() {
        for b in &plan.subnets[i + 1..] {
            if a.network == b.network && a.cidr.overlaps(&b.cidr) {
                conflicts.push(Conflict::new(
                    ConflictKind::SubnetOverlap,
                    vec![a.label.to_string(), b.label.to_string()],
                    format!("{} overlaps {} in {}", a.cidr, b.cidr, a.network),
                ));
            }
        }
    }
}

// ============================================================================
// Services
// ============================================================================

fn check_services(plan: &Plan, conflicts: &mut Vec<Conflict>) {
    for service in &plan.services {
        if service.placement.is_empty() {
            conflicts.push(Conflict::new(
                ConflictKind::UnplacedService,
                vec![service.name.to_string()],
                "service has no placement subnets and is unroutable",
            ));
            continue;
        }

        let reachable = service
            .placement
            .iter()
            .filter_map(|label| plan.subnet(label.as_str()))
            .any(|subnet| subnet.visibility.is_public());
        if service.visibility.is_public() && !reachable {
            conflicts.push(Conflict::new(
                ConflictKind::VisibilityMismatch,
                vec![service.name.to_string()],
                "public service is placed only in private subnets",
            ));
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

fn check_selectors(plan: &Plan, conflicts: &mut Vec<Conflict>) {
    let mut reported: BTreeSet<&Selector> = BTreeSet::new();

    for rule in &plan.rules {
        for selector in [&rule.source, &rule.destination] {
            if reported.contains(selector) {
                continue;
            }
            if let Some(detail) = dangling(plan, selector) {
                reported.insert(selector);
                conflicts.push(Conflict::new(
                    ConflictKind::DanglingSelector,
                    vec![selector.name().to_string(), rule.to_string()],
                    detail,
                ));
            }
        }
    }
}

/// Why a selector resolves to no addresses, if it does not
fn dangling(plan: &Plan, selector: &Selector) -> Option<String> {
    match selector {
        Selector::Network { network, .. } => plan
            .network(network.as_str())
            .is_none()
            .then(|| format!("network {} is not in the plan", network)),
        Selector::Service { service, subnets } => {
            if plan.service(service.as_str()).is_none() {
                return Some(format!("service {} is not in the plan", service));
            }
            if subnets.is_empty() {
                return Some(format!("selector for {} names no subnets", service));
            }
            let missing: Vec<&str> = subnets
                .iter()
                .filter(|label| plan.subnet(label.as_str()).is_none())
                .map(|label| label.as_str())
                .collect();
            (!missing.is_empty())
                .then(|| format!("subnets {} are not in the plan", missing.join(", ")))
        }
    }
}

fn check_contradictions(rules: &[AccessRule], conflicts: &mut Vec<Conflict>) {
    let mut effects: BTreeMap<(&Selector, &Selector, Port, Protocol), BTreeSet<Effect>> =
        BTreeMap::new();
    for rule in rules {
        effects
            .entry((&rule.source, &rule.destination, rule.port, rule.protocol))
            .or_default()
            .insert(rule.effect);
    }

    for ((source, destination, port, protocol), found) in effects {
        if found.len() > 1 {
            conflicts.push(Conflict::new(
                ConflictKind::ContradictoryRules,
                vec![source.name().to_string(), destination.name().to_string()],
                format!(
                    "{} -> {} {}/{} is both allowed and denied",
                    source, destination, port, protocol
                ),
            ));
        }
    }
}

fn check_ports(plan: &Plan, conflicts: &mut Vec<Conflict>) {
    let mut reported = BTreeSet::new();

    for rule in plan.rules.iter().filter(|r| r.effect == Effect::Allow) {
        let Some(name) = rule.destination.service() else {
            continue;
        };
        let Some(service) = plan.service(name.as_str()) else {
            continue;
        };
        if !service.ports.contains(&rule.port) && reported.insert((name, rule.port)) {
            conflicts.push(Conflict::new(
                ConflictKind::UnexposedPort,
                vec![name.to_string(), rule.port.to_string()],
                format!(
                    "rule {} targets port {} which {} does not expose",
                    rule, rule.port, name
                ),
            ));
        }
    }
}

fn check_networks(plan: &Plan, conflicts: &mut Vec<Conflict>) {
    let mut reported = BTreeSet::new();

    for rule in &plan.rules {
        let source = match &rule.source {
            Selector::Network { network, .. } => Some(network),
            Selector::Service { service, .. } => plan.service_network(service.as_str()),
        };
        let destination = rule
            .destination
            .service()
            .and_then(|s| plan.service_network(s.as_str()));

        if let (Some(source), Some(destination)) = (source, destination) {
            if source != destination
                && reported.insert((rule.source.name(), rule.destination.name()))
            {
                conflicts.push(Conflict::new(
                    ConflictKind::CrossNetwork,
                    vec![rule.source.name().to_string(), rule.destination.name().to_string()],
                    format!(
                        "{} is in {} but {} is in {}",
                        rule.source.name(),
                        source,
                        rule.destination.name(),
                        destination
                    ),
                ));
            }
        }
    }
}
