// Copyright (c) 2025 - Cowboy AI, Inc.
//! Route Planner
//!
//! Default routes for every subnet:
//!
//! - public subnets route `0.0.0.0/0` to their network's internet gateway
//! - private subnets route `0.0.0.0/0` to a NAT gateway hosted in a public
//!   subnet of the same zone, or in the network's first public subnet when
//!   their zone has none
//!
//! A network without public subnets has no way out; its private subnets get
//! no default route.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::domain::{Ipv4Cidr, NetworkName, SubnetLabel};
use crate::plan::ResolvedSubnet;

/// Next hop of a route
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RouteTarget {
    /// The network's internet gateway
    InternetGateway { network: NetworkName },
    /// A NAT gateway placed in the given public subnet
    NatGateway { subnet: SubnetLabel },
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::InternetGateway { network } => write!(f, "igw({})", network),
            RouteTarget::NatGateway { subnet } => write!(f, "nat({})", subnet),
        }
    }
}

/// A route table entry for one subnet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteEntry {
    pub subnet: SubnetLabel,
    pub destination: Ipv4Cidr,
    pub target: RouteTarget,
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} via {}", self.subnet, self.destination, self.target)
    }
}

/// Derive default routes for `subnets`, in subnet order
pub fn plan_routes(subnets: &[ResolvedSubnet]) -> Vec<RouteEntry> {
    let mut routes = Vec::with_capacity(subnets.len());

    for subnet in subnets {
        let target = if subnet.visibility.is_public() {
            Some(RouteTarget::InternetGateway {
                network: subnet.network.clone(),
            })
        } else {
            nat_host(subnets, subnet).map(|host| RouteTarget::NatGateway {
                subnet: host.label.clone(),
            })
        };

        match target {
            Some(target) => routes.push(RouteEntry {
                subnet: subnet.label.clone(),
                destination: Ipv4Cidr::any(),
                target,
            }),
            None => debug!(
                "Subnet {} in {} has no public subnet to route through",
                subnet.label, subnet.network
            ),
        }
    }

    routes
}

/// Public subnet hosting the NAT gateway for a private subnet
fn nat_host<'a>(
    subnets: &'a [ResolvedSubnet],
    private: &ResolvedSubnet,
) -> Option<&'a ResolvedSubnet> {
    let mut public = subnets
        .iter()
        .filter(|s| s.network == private.network && s.visibility.is_public());

    let first = public.clone().next();
    public.find(|s| s.zone == private.zone).or(first)
}
