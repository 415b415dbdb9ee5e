// Copyright (c) 2025 - Cowboy AI, Inc.
//! Plan
//!
//! The resolved output of a planning run: networks, subnets with their
//! allocated blocks, placed services, access rules and default routes.
//!
//! A plan is plain data owned by the caller. Fields are public so tools that
//! diff or post-process plans can construct and inspect them directly; the
//! conflict checker does not assume a plan came from [`Plan::build`].

pub mod emitter;

use std::collections::BTreeSet;
use tracing::info;

use crate::allocator::{allocate, CapacityError, SubnetRequest};
use crate::domain::{Ipv4Cidr, NetworkName, Port, ServiceName, SubnetLabel, Visibility, Zone};
use crate::routing::{plan_routes, RouteEntry};
use crate::rules::{derive, AccessRule};
use crate::topology::TopologyModel;

pub use emitter::{
    emit, emit_validated, NetworkOutputs, NetworkRecord, PlanMetadata, PlanWarning, RouteRecord,
    RuleRecord, SerializedPlan, ServiceRecord, SubnetRecord,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNetwork {
    pub name: NetworkName,
    pub cidr: Ipv4Cidr,
}

/// A subnet with its allocated block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubnet {
    pub network: NetworkName,
    pub label: SubnetLabel,
    pub cidr: Ipv4Cidr,
    pub zone: Zone,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedService {
    pub name: ServiceName,
    pub ports: BTreeSet<Port>,
    pub visibility: Visibility,
    pub placement: Vec<SubnetLabel>,
}

/// Complete description of topology, rules and routes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub networks: Vec<ResolvedNetwork>,
    pub subnets: Vec<ResolvedSubnet>,
    pub services: Vec<ResolvedService>,
    pub rules: Vec<AccessRule>,
    pub routes: Vec<RouteEntry>,
}

impl Plan {
    /// Allocate subnets, derive rules and routes for `model`
    ///
    /// Networks are allocated one at a time in declaration order; the first
    /// network that runs out of space aborts the build.
    pub fn build(model: &TopologyModel) -> Result<Plan, CapacityError> {
        let mut plan = Plan::default();

        for network in model.networks() {
            let requests: Vec<SubnetRequest> = model
                .subnets_in(network.name.as_str())
                .map(|s| SubnetRequest::new(s.label.clone(), s.size))
                .collect();
            let allocation = allocate(network, &requests)?;

            plan.networks.push(ResolvedNetwork {
                name: network.name.clone(),
                cidr: network.cidr,
            });

            for subnet in model.subnets_in(network.name.as_str()) {
                if let Some(cidr) = allocation.get(subnet.label.as_str()) {
                    plan.subnets.push(ResolvedSubnet {
                        network: subnet.network.clone(),
                        label: subnet.label.clone(),
                        cidr,
                        zone: subnet.zone.clone(),
                        visibility: subnet.visibility,
                    });
                }
            }
        }

        plan.services = model
            .services()
            .iter()
            .map(|s| ResolvedService {
                name: s.name.clone(),
                ports: s.ports.clone(),
                visibility: s.visibility,
                placement: s.placement.clone(),
            })
            .collect();

        plan.rules = derive(model);
        plan.routes = plan_routes(&plan.subnets);

        info!(
            "Built plan: {} networks, {} subnets, {} services, {} rules, {} routes",
            plan.networks.len(),
            plan.subnets.len(),
            plan.services.len(),
            plan.rules.len(),
            plan.routes.len()
        );
        Ok(plan)
    }

    pub fn network(&self, name: &str) -> Option<&ResolvedNetwork> {
        self.networks.iter().find(|n| n.name.as_str() == name)
    }

    pub fn subnet(&self, label: &str) -> Option<&ResolvedSubnet> {
        self.subnets.iter().find(|s| s.label.as_str() == label)
    }

    pub fn service(&self, name: &str) -> Option<&ResolvedService> {
        self.services.iter().find(|s| s.name.as_str() == name)
    }

    /// Network a service's placement resolves to
    pub fn service_network(&self, name: &str) -> Option<&NetworkName> {
        let service = self.service(name)?;
        service
            .placement
            .iter()
            .find_map(|label| self.subnet(label.as_str()))
            .map(|s| &s.network)
    }
}
