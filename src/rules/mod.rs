// Copyright (c) 2025 - Cowboy AI, Inc.
//! Rule Deriver
//!
//! Expands connectivity intents into directional access rules.
//!
//! Every intent `src -> dst:port/proto` yields an egress rule attached to
//! `src` and an ingress rule attached to `dst`, both naming the placement
//! subnets of each side. Identical rules collapse. When two services each
//! declare the other on the same port, protocol and effect, the four rules
//! collapse into a bidirectional pair: one rule at each endpoint.
//!
//! Network-wide sources (every address of a network) only yield the ingress
//! half, attached to the destination service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use crate::domain::{Ipv4Cidr, NetworkName, Port, Protocol, ServiceName, SubnetLabel};
use crate::topology::{ConnectivityIntent, Effect, Endpoint, TopologyModel};

/// Which side of a connection a rule is enforced on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Outbound, enforced at the source boundary
    Egress,
    /// Inbound, enforced at the destination boundary
    Ingress,
    /// Both ways, enforced at the source boundary
    Bidirectional,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Egress => write!(f, "egress"),
            Direction::Ingress => write!(f, "ingress"),
            Direction::Bidirectional => write!(f, "bidirectional"),
        }
    }
}

/// The set of addresses a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    /// A service, through its placement subnets
    Service {
        service: ServiceName,
        subnets: Vec<SubnetLabel>,
    },
    /// Every address of a network
    Network { network: NetworkName, cidr: Ipv4Cidr },
}

impl Selector {
    /// Service or network name
    pub fn name(&self) -> &str {
        match self {
            Selector::Service { service, .. } => service.as_str(),
            Selector::Network { network, .. } => network.as_str(),
        }
    }

    /// Subnets named by the selector (empty for network selectors)
    pub fn subnets(&self) -> &[SubnetLabel] {
        match self {
            Selector::Service { subnets, .. } => subnets,
            Selector::Network { .. } => &[],
        }
    }

    pub fn service(&self) -> Option<&ServiceName> {
        match self {
            Selector::Service { service, .. } => Some(service),
            Selector::Network { .. } => None,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Service { service, subnets } => write!(
                f,
                "{}[{}]",
                service,
                subnets
                    .iter()
                    .map(SubnetLabel::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            Selector::Network { network, cidr } => write!(f, "{}({})", network, cidr),
        }
    }
}

/// A derived, directional permission (or prohibition)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessRule {
    pub source: Selector,
    pub destination: Selector,
    pub port: Port,
    pub protocol: Protocol,
    pub direction: Direction,
    pub effect: Effect,
}

impl AccessRule {
    /// Service whose boundary enforces the rule
    pub fn boundary(&self) -> Option<&ServiceName> {
        match self.direction {
            Direction::Egress | Direction::Bidirectional => self.source.service(),
            Direction::Ingress => self.destination.service(),
        }
    }

    /// Emission order: source name, destination name, port, then the rest
    #[allow(clippy::type_complexity)]
    fn sort_key(
        &self,
    ) -> (
        &str,
        &str,
        Port,
        Protocol,
        Direction,
        Effect,
        &Selector,
        &Selector,
    ) {
        (
            self.source.name(),
            self.destination.name(),
            self.port,
            self.protocol,
            self.direction,
            self.effect,
            &self.source,
            &self.destination,
        )
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.direction {
            Direction::Egress => "->",
            Direction::Ingress => "=>",
            Direction::Bidirectional => "<->",
        };
        write!(
            f,
            "{} {} {} {} {}/{}",
            self.effect, self.source, arrow, self.destination, self.port, self.protocol
        )
    }
}

/// Normalized intent used for deduplication and reverse lookups
type IntentKey = (Endpoint, ServiceName, Port, Protocol, Effect);

fn intent_key(intent: &ConnectivityIntent) -> IntentKey {
    (
        intent.source.clone(),
        intent.destination.clone(),
        intent.port,
        intent.protocol,
        intent.effect,
    )
}

/// Derives access rules from the services and networks of one model
pub struct RuleDeriver<'a> {
    model: &'a TopologyModel,
}

impl<'a> RuleDeriver<'a> {
    pub fn new(model: &'a TopologyModel) -> Self {
        Self { model }
    }

    /// Expand `intents` into a deduplicated, sorted rule list
    pub fn derive(&self, intents: &[ConnectivityIntent]) -> Vec<AccessRule> {
        let keys: BTreeSet<IntentKey> = intents.iter().map(intent_key).collect();
        let mut rules = Vec::with_capacity(keys.len() * 2);

        for (source, destination, port, protocol, effect) in &keys {
            let dst = self.service_selector(destination);
            let rule = |source: Selector, destination: Selector, direction: Direction| AccessRule {
                source,
                destination,
                port: *port,
                protocol: *protocol,
                direction,
                effect: *effect,
            };

            match source {
                Endpoint::Service(src_name) => {
                    let src = self.service_selector(src_name);
                    let reverse: IntentKey = (
                        Endpoint::Service(destination.clone()),
                        src_name.clone(),
                        *port,
                        *protocol,
                        *effect,
                    );

                    if keys.contains(&reverse) {
                        rules.push(rule(src, dst, Direction::Bidirectional));
                    } else {
                        rules.push(rule(src.clone(), dst.clone(), Direction::Egress));
                        rules.push(rule(src, dst, Direction::Ingress));
                    }
                }
                Endpoint::Network(network) => {
                    if let Some(src) = self.network_selector(network) {
                        rules.push(rule(src, dst, Direction::Ingress));
                    }
                }
            }
        }

        rules.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        rules.dedup();

        debug!(
            "Derived {} access rules from {} intents ({} distinct)",
            rules.len(),
            intents.len(),
            keys.len()
        );
        rules
    }

    fn service_selector(&self, name: &ServiceName) -> Selector {
        let subnets = self
            .model
            .service(name.as_str())
            .map(|s| s.placement.clone())
            .unwrap_or_default();
        Selector::Service {
            service: name.clone(),
            subnets,
        }
    }

    fn network_selector(&self, name: &NetworkName) -> Option<Selector> {
        self.model
            .network(name.as_str())
            .map(|network| Selector::Network {
                network: network.name.clone(),
                cidr: network.cidr,
            })
    }
}

/// Derive the rules for every intent declared in `model`
pub fn derive(model: &TopologyModel) -> Vec<AccessRule> {
    RuleDeriver::new(model).derive(model.intents())
}
