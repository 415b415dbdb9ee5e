// Copyright (c) 2025 - Cowboy AI, Inc.
//! Plan Emitter
//!
//! Pure transformation from a [`Plan`] to the external schema. Emission never
//! validates: plans that did not go through the conflict checker are emitted
//! with an `unvalidated` warning instead.
//!
//! ```json
//! {
//!   "networks": [{ "name": "vpc", "cidr": "10.0.0.0/16" }],
//!   "subnets": [{ "network": "vpc", "label": "private-1", "cidr": "10.0.2.0/24", ... }],
//!   "services": [{ "name": "auth", "ports": [9898], ... }],
//!   "rules": [{ "sourceSelector": { ... }, "destSelector": { ... }, "port": 9898, ... }],
//!   "routes": [{ "subnet": "private-1", "destination": "0.0.0.0/0", "target": { ... } }],
//!   "outputs": [{ "network": "vpc", "publicSubnets": ["public-1"], ... }],
//!   "warnings": []
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Plan, ResolvedNetwork};
use crate::checker::ValidatedPlan;
use crate::domain::{
    Ipv4Cidr, NetworkName, Port, Protocol, ServiceName, SubnetLabel, Visibility, Zone,
};
use crate::errors::{PlannerError, PlannerResult};
use crate::routing::RouteTarget;
use crate::rules::{Direction, Selector};
use crate::topology::Effect;

/// Marker attached to plans emitted without a clean check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanWarning {
    Unvalidated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub name: NetworkName,
    pub cidr: Ipv4Cidr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetRecord {
    pub network: NetworkName,
    pub label: SubnetLabel,
    pub cidr: Ipv4Cidr,
    pub zone: Zone,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: ServiceName,
    pub ports: Vec<Port>,
    pub visibility: Visibility,
    pub placement: Vec<SubnetLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub source_selector: Selector,
    pub dest_selector: Selector,
    pub port: Port,
    pub protocol: Protocol,
    pub direction: Direction,
    pub effect: Effect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub subnet: SubnetLabel,
    pub destination: Ipv4Cidr,
    pub target: RouteTarget,
}

/// Named handles a network exports to the layers deployed on top of it
///
/// Subnets are listed per visibility in declaration order, so a consumer can
/// import "the second public subnet" by position alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkOutputs {
    pub network: NetworkName,
    pub cidr: Ipv4Cidr,
    pub public_subnets: Vec<SubnetLabel>,
    pub private_subnets: Vec<SubnetLabel>,
}

impl NetworkOutputs {
    /// Subnet at `index` among those with `visibility`, counting from zero
    pub fn subnet(&self, visibility: Visibility, index: usize) -> Option<&SubnetLabel> {
        match visibility {
            Visibility::Public => self.public_subnets.get(index),
            Visibility::Private => self.private_subnets.get(index),
        }
    }
}

/// Identity of one emitted plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetadata {
    pub plan_id: Uuid,
    pub generated_at: DateTime<Utc>,
}

/// External representation of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedPlan {
    pub networks: Vec<NetworkRecord>,
    pub subnets: Vec<SubnetRecord>,
    pub services: Vec<ServiceRecord>,
    pub rules: Vec<RuleRecord>,
    #[serde(default)]
    pub routes: Vec<RouteRecord>,
    #[serde(default)]
    pub outputs: Vec<NetworkOutputs>,
    #[serde(default)]
    pub warnings: Vec<PlanWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PlanMetadata>,
}

impl SerializedPlan {
    /// Attach a fresh plan id and generation time
    pub fn stamped(mut self) -> Self {
        self.metadata = Some(PlanMetadata {
            plan_id: Uuid::now_v7(),
            generated_at: Utc::now(),
        });
        self
    }

    /// Exported handles of one network
    pub fn outputs_of(&self, network: &str) -> Option<&NetworkOutputs> {
        self.outputs.iter().find(|o| o.network.as_str() == network)
    }

    pub fn is_validated(&self) -> bool {
        !self.warnings.contains(&PlanWarning::Unvalidated)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> PlannerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> PlannerResult<Self> {
        serde_json::from_str(json).map_err(|e| PlannerError::Deserialization(e.to_string()))
    }
}

/// Emit a plan that was not checked; the output carries an `unvalidated` warning
pub fn emit(plan: &Plan) -> SerializedPlan {
    let mut serialized = records(plan);
    serialized.warnings.push(PlanWarning::Unvalidated);
    serialized
}

/// Emit a plan the conflict checker accepted
pub fn emit_validated(plan: &ValidatedPlan) -> SerializedPlan {
    records(plan.plan())
}

fn records(plan: &Plan) -> SerializedPlan {
    SerializedPlan {
        networks: plan
            .networks
            .iter()
            .map(|n| NetworkRecord {
                name: n.name.clone(),
                cidr: n.cidr,
            })
            .collect(),
        subnets: plan
            .subnets
            .iter()
            .map(|s| SubnetRecord {
                network: s.network.clone(),
                label: s.label.clone(),
                cidr: s.cidr,
                zone: s.zone.clone(),
                visibility: s.visibility,
            })
            .collect(),
        services: plan
            .services
            .iter()
            .map(|s| ServiceRecord {
                name: s.name.clone(),
                ports: s.ports.iter().copied().collect(),
                visibility: s.visibility,
                placement: s.placement.clone(),
            })
            .collect(),
        rules: plan
            .rules
            .iter()
            .map(|r| RuleRecord {
                source_selector: r.source.clone(),
                dest_selector: r.destination.clone(),
                port: r.port,
                protocol: r.protocol,
                direction: r.direction,
                effect: r.effect,
            })
            .collect(),
        routes: plan
            .routes
            .iter()
            .map(|r| RouteRecord {
                subnet: r.subnet.clone(),
                destination: r.destination,
                target: r.target.clone(),
            })
            .collect(),
        outputs: plan.networks.iter().map(|n| outputs(plan, n)).collect(),
        warnings: Vec::new(),
        metadata: None,
    }
}

fn outputs(plan: &Plan, network: &ResolvedNetwork) -> NetworkOutputs {
    let labels = |visibility: Visibility| -> Vec<SubnetLabel> {
        plan.subnets
            .iter()
            .filter(|s| s.network == network.name && s.visibility == visibility)
            .map(|s| s.label.clone())
            .collect()
    };

    NetworkOutputs {
        network: network.name.clone(),
        cidr: network.cidr,
        public_subnets: labels(Visibility::Public),
        private_subnets: labels(Visibility::Private),
    }
}
