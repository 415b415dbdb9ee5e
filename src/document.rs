// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Document
//!
//! Declarative JSON input for a planning run. A document is replayed into a
//! [`TopologyModel`] through the same declaration calls a library caller
//! would make, so every build-time invariant applies to it unchanged.
//!
//! ```json
//! {
//!   "networks": [{
//!     "name": "vpc",
//!     "cidr": "10.0.0.0/16",
//!     "subnets": [
//!       { "label": "public-1", "zone": "a", "visibility": "public", "size": { "prefix": 24 } },
//!       { "label": "private-1", "zone": "a", "visibility": "private" }
//!     ]
//!   }],
//!   "services": [{ "name": "mysql", "ports": [3306], "visibility": "private", "placement": ["private-1"] }],
//!   "intents": [{ "source": "auth", "destination": "mysql", "port": 3306 }],
//!   "networkIngress": [{ "network": "vpc", "destination": "mysql", "port": 3306 }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Protocol, SubnetSize, ValidationError, Visibility};
use crate::errors::{PlannerError, PlannerResult};
use crate::topology::{Effect, TopologyModel};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyDocument {
    #[serde(default)]
    pub networks: Vec<NetworkEntry>,
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
    #[serde(default)]
    pub intents: Vec<IntentEntry>,
    #[serde(default)]
    pub network_ingress: Vec<IngressEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub name: String,
    pub cidr: String,
    #[serde(default)]
    pub subnets: Vec<SubnetEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetEntry {
    pub label: String,
    pub zone: String,
    pub visibility: Visibility,
    /// Even split among siblings when omitted
    #[serde(default)]
    pub size: SubnetSize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub ports: Vec<u16>,
    pub visibility: Visibility,
    #[serde(default)]
    pub placement: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEntry {
    pub source: String,
    pub destination: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub effect: Effect,
}

/// Every address of `network` may reach `destination`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressEntry {
    pub network: String,
    pub destination: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: Protocol,
}

impl TopologyDocument {
    pub fn from_json(json: &str) -> PlannerResult<Self> {
        serde_json::from_str(json).map_err(|e| PlannerError::Deserialization(e.to_string()))
    }

    /// Replay the document into a fresh model
    ///
    /// Networks and their subnets come first, then services, then intents,
    /// so references within the document may appear in any order.
    pub fn to_model(&self) -> Result<TopologyModel, ValidationError> {
        let mut model = TopologyModel::new();

        for network in &self.networks {
            model.add_network(&network.name, &network.cidr)?;
            for subnet in &network.subnets {
                model.add_subnet_sized(
                    &network.name,
                    &subnet.label,
                    &subnet.zone,
                    subnet.visibility,
                    subnet.size,
                )?;
            }
        }

        for service in &self.services {
            model.add_service(
                &service.name,
                service.ports.iter().copied(),
                service.visibility,
                &service.placement,
            )?;
        }

        for intent in &self.intents {
            match intent.effect {
                Effect::Allow => model.add_intent(
                    &intent.source,
                    &intent.destination,
                    intent.port,
                    intent.protocol,
                )?,
                Effect::Deny => model.add_deny_intent(
                    &intent.source,
                    &intent.destination,
                    intent.port,
                    intent.protocol,
                )?,
            };
        }

        for ingress in &self.network_ingress {
            model.add_network_ingress(
                &ingress.network,
                &ingress.destination,
                ingress.port,
                ingress.protocol,
            )?;
        }

        debug!(
            "Loaded document: {} networks, {} services, {} intents",
            model.networks().len(),
            model.services().len(),
            model.intents().len()
        );
        Ok(model)
    }
}
