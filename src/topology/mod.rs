// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Model
//!
//! The topology model is the root of a planning run. It owns every declared
//! network, subnet, service and connectivity intent, and enforces build-time
//! invariants on each declaration so later stages only ever see references
//! that resolve.
//!
//! ## Usage
//!
//! ```rust
//! use topology_planner::topology::TopologyModel;
//! use topology_planner::domain::{Protocol, Visibility};
//!
//! let mut model = TopologyModel::new();
//! model.add_network("main", "10.0.0.0/16").unwrap();
//! model.add_subnet("main", "private-a", "a", Visibility::Private).unwrap();
//! model.add_service("auth", [9898], Visibility::Private, ["private-a"]).unwrap();
//! model.add_service("gateway", [80], Visibility::Private, ["private-a"]).unwrap();
//! model.add_intent("gateway", "auth", 9898, Protocol::Tcp).unwrap();
//!
//! assert_eq!(model.intents().len(), 1);
//! ```
//!
//! A model is owned by exactly one planning run. Independent runs each build
//! their own model.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

use crate::domain::invariants::{
    validate_network_block, validate_single_network, validate_subnet_size,
};
use crate::domain::{
    Ipv4Cidr, NetworkName, Port, Protocol, ServiceName, SubnetLabel, SubnetSize,
    ValidationError, Visibility, Zone,
};

/// Identifier of a declared connectivity intent (declaration index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntentHandle(usize);

impl IntentHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A named address block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDecl {
    pub name: NetworkName,
    pub cidr: Ipv4Cidr,
}

/// A subnet request within a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetDecl {
    pub network: NetworkName,
    pub label: SubnetLabel,
    pub zone: Zone,
    pub visibility: Visibility,
    pub size: SubnetSize,
}

/// A service and where it may run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDecl {
    pub name: ServiceName,
    pub ports: BTreeSet<Port>,
    pub visibility: Visibility,
    /// Subnet labels in declaration order, deduplicated
    pub placement: Vec<SubnetLabel>,
}

/// Whether an intent grants or forbids traffic
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Allow => write!(f, "allow"),
            Effect::Deny => write!(f, "deny"),
        }
    }
}

/// Origin of traffic in a connectivity intent
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    /// A declared service, through its placement subnets
    Service(ServiceName),
    /// Every address of a declared network
    Network(NetworkName),
}

impl Endpoint {
    pub fn name(&self) -> &str {
        match self {
            Endpoint::Service(name) => name.as_str(),
            Endpoint::Network(name) => name.as_str(),
        }
    }

    pub fn as_service(&self) -> Option<&ServiceName> {
        match self {
            Endpoint::Service(name) => Some(name),
            Endpoint::Network(_) => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Service(name) => write!(f, "service:{}", name),
            Endpoint::Network(name) => write!(f, "network:{}", name),
        }
    }
}

/// "source may reach destination on port/protocol" (or may not, for deny)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectivityIntent {
    pub source: Endpoint,
    pub destination: ServiceName,
    pub port: Port,
    pub protocol: Protocol,
    pub effect: Effect,
}

impl fmt::Display for ConnectivityIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}:{}/{}",
            self.effect,
            self.source.name(),
            self.destination,
            self.port,
            self.protocol
        )
    }
}

/// Topology model - the planning run's root
#[derive(Debug, Clone, Default)]
pub struct TopologyModel {
    networks: Vec<NetworkDecl>,
    subnets: Vec<SubnetDecl>,
    services: Vec<ServiceDecl>,
    intents: Vec<ConnectivityIntent>,

    network_index: HashMap<NetworkName, usize>,
    subnet_index: HashMap<SubnetLabel, usize>,
    service_index: HashMap<ServiceName, usize>,
}

impl TopologyModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Declare a network
    ///
    /// # Errors
    /// - Malformed name or CIDR
    /// - Zero-length prefix
    /// - Duplicate network name
    pub fn add_network(&mut self, name: &str, cidr: &str) -> Result<NetworkName, ValidationError> {
        let name = NetworkName::new(name)?;
        let cidr: Ipv4Cidr = cidr.parse()?;
        validate_network_block(&name, &cidr)?;

        if self.network_index.contains_key(&name) {
            return Err(ValidationError::DuplicateNetwork(name));
        }

        debug!("Declared network {} ({})", name, cidr);
        self.network_index.insert(name.clone(), self.networks.len());
        self.networks.push(NetworkDecl {
            name: name.clone(),
            cidr,
        });

        Ok(name)
    }

    /// Declare a subnet that shares its network evenly with its siblings
    pub fn add_subnet(
        &mut self,
        network: &str,
        label: &str,
        zone: &str,
        visibility: Visibility,
    ) -> Result<SubnetLabel, ValidationError> {
        self.add_subnet_sized(network, label, zone, visibility, SubnetSize::Even)
    }

    /// Declare a subnet with an explicit size request
    ///
    /// # Errors
    /// - Unknown network
    /// - Malformed label or zone
    /// - Duplicate label (labels are unique across all networks)
    /// - Size that cannot sit strictly inside the network
    pub fn add_subnet_sized(
        &mut self,
        network: &str,
        label: &str,
        zone: &str,
        visibility: Visibility,
        size: SubnetSize,
    ) -> Result<SubnetLabel, ValidationError> {
        let parent = self
            .network(network)
            .ok_or_else(|| ValidationError::UnknownNetwork(network.to_string()))?;
        let network = parent.name.clone();
        let parent_cidr = parent.cidr;

        let label = SubnetLabel::new(label)?;
        let zone = Zone::new(zone)?;

        if self.subnet_index.contains_key(&label) {
            return Err(ValidationError::DuplicateSubnet(label));
        }

        validate_subnet_size(&network, &label, &parent_cidr, &size)?;

        debug!(
            "Declared {} subnet {} in {} (zone {}, size {})",
            visibility, label, network, zone, size
        );
        self.subnet_index.insert(label.clone(), self.subnets.len());
        self.subnets.push(SubnetDecl {
            network,
            label: label.clone(),
            zone,
            visibility,
            size,
        });

        Ok(label)
    }

    /// Declare a service
    ///
    /// Duplicate ports and duplicate placement labels are collapsed. An empty
    /// placement is accepted here and reported later as an unplaced service.
    ///
    /// # Errors
    /// - Malformed name or port 0
    /// - Duplicate service name
    /// - Unknown placement subnet
    /// - Placement subnets in more than one network
    pub fn add_service<P, L, S>(
        &mut self,
        name: &str,
        ports: P,
        visibility: Visibility,
        placement: L,
    ) -> Result<ServiceName, ValidationError>
    where
        P: IntoIterator<Item = u16>,
        L: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = ServiceName::new(name)?;
        if self.service_index.contains_key(&name) {
            return Err(ValidationError::DuplicateService(name));
        }

        let ports = ports
            .into_iter()
            .map(Port::new)
            .collect::<Result<BTreeSet<_>, _>>()?;

        let mut labels: Vec<SubnetLabel> = Vec::new();
        let mut networks: Vec<NetworkName> = Vec::new();
        for label in placement {
            let label = label.as_ref();
            let subnet = self
                .subnet(label)
                .ok_or_else(|| ValidationError::UnknownSubnet(label.to_string()))?;
            if !labels.contains(&subnet.label) {
                labels.push(subnet.label.clone());
                networks.push(subnet.network.clone());
            }
        }
        validate_single_network(&name, &networks)?;

        debug!(
            "Declared service {} on ports {:?} in {:?}",
            name,
            ports.iter().map(Port::value).collect::<Vec<_>>(),
            labels.iter().map(SubnetLabel::as_str).collect::<Vec<_>>()
        );
        self.service_index.insert(name.clone(), self.services.len());
        self.services.push(ServiceDecl {
            name: name.clone(),
            ports,
            visibility,
            placement: labels,
        });

        Ok(name)
    }

    /// Declare that `source` may reach `destination` on `port`/`protocol`
    pub fn add_intent(
        &mut self,
        source: &str,
        destination: &str,
        port: u16,
        protocol: Protocol,
    ) -> Result<IntentHandle, ValidationError> {
        let source = self.resolve_service(source)?;
        self.push_intent(Endpoint::Service(source), destination, port, protocol, Effect::Allow)
    }

    /// Declare that `source` must not reach `destination` on `port`/`protocol`
    pub fn add_deny_intent(
        &mut self,
        source: &str,
        destination: &str,
        port: u16,
        protocol: Protocol,
    ) -> Result<IntentHandle, ValidationError> {
        let source = self.resolve_service(source)?;
        self.push_intent(Endpoint::Service(source), destination, port, protocol, Effect::Deny)
    }

    /// Declare that every address of `network` may reach `destination`
    ///
    /// Only an ingress rule is derived for such intents; the network itself
    /// has no boundary to attach an egress rule to.
    pub fn add_network_ingress(
        &mut self,
        network: &str,
        destination: &str,
        port: u16,
        protocol: Protocol,
    ) -> Result<IntentHandle, ValidationError> {
        let network = self
            .network(network)
            .map(|n| n.name.clone())
            .ok_or_else(|| ValidationError::UnknownNetwork(network.to_string()))?;
        self.push_intent(Endpoint::Network(network), destination, port, protocol, Effect::Allow)
    }

    fn push_intent(
        &mut self,
        source: Endpoint,
        destination: &str,
        port: u16,
        protocol: Protocol,
        effect: Effect,
    ) -> Result<IntentHandle, ValidationError> {
        let destination = self.resolve_service(destination)?;
        let port = Port::new(port)?;

        let intent = ConnectivityIntent {
            source,
            destination,
            port,
            protocol,
            effect,
        };
        debug!("Declared intent {}", intent);

        let handle = IntentHandle(self.intents.len());
        self.intents.push(intent);
        Ok(handle)
    }

    /// Remove a service that no intent references
    ///
    /// # Errors
    /// - Unknown service
    /// - Service still referenced as source or destination of an intent
    pub fn remove_service(&mut self, name: &str) -> Result<ServiceDecl, ValidationError> {
        let index = *self
            .service_index
            .get(name)
            .ok_or_else(|| ValidationError::UnknownService(name.to_string()))?;

        let service = self.services[index].name.clone();
        let referencing = self
            .intents
            .iter()
            .filter(|i| i.destination == service || i.source.as_service() == Some(&service))
            .count();
        if referencing > 0 {
            return Err(ValidationError::ServiceInUse {
                service,
                intents: referencing,
            });
        }

        let removed = self.services.remove(index);
        self.service_index = self
            .services
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        debug!("Removed service {}", removed.name);
        Ok(removed)
    }

    fn resolve_service(&self, name: &str) -> Result<ServiceName, ValidationError> {
        self.service(name)
            .map(|s| s.name.clone())
            .ok_or_else(|| ValidationError::UnknownService(name.to_string()))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Networks in declaration order
    pub fn networks(&self) -> &[NetworkDecl] {
        &self.networks
    }

    /// Subnets in declaration order
    pub fn subnets(&self) -> &[SubnetDecl] {
        &self.subnets
    }

    /// Services in declaration order
    pub fn services(&self) -> &[ServiceDecl] {
        &self.services
    }

    /// Intents in declaration order
    pub fn intents(&self) -> &[ConnectivityIntent] {
        &self.intents
    }

    pub fn network(&self, name: &str) -> Option<&NetworkDecl> {
        self.network_index.get(name).map(|&i| &self.networks[i])
    }

    pub fn subnet(&self, label: &str) -> Option<&SubnetDecl> {
        self.subnet_index.get(label).map(|&i| &self.subnets[i])
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDecl> {
        self.service_index.get(name).map(|&i| &self.services[i])
    }

    pub fn intent(&self, handle: IntentHandle) -> Option<&ConnectivityIntent> {
        self.intents.get(handle.0)
    }

    /// Subnets of one network in declaration order
    pub fn subnets_in<'a>(&'a self, network: &'a str) -> impl Iterator<Item = &'a SubnetDecl> + 'a {
        self.subnets
            .iter()
            .filter(move |s| s.network.as_str() == network)
    }

    /// Network a service is placed in, if it is placed at all
    pub fn service_network(&self, name: &str) -> Option<&NetworkName> {
        let service = self.service(name)?;
        let first = service.placement.first()?;
        self.subnet(first.as_str()).map(|s| &s.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_model() -> TopologyModel {
        let mut model = TopologyModel::new();
        model.add_network("main", "10.0.0.0/16").unwrap();
        model
            .add_subnet("main", "private-a", "a", Visibility::Private)
            .unwrap();
        model
            .add_subnet("main", "private-b", "b", Visibility::Private)
            .unwrap();
        model
            .add_service("auth", [9898], Visibility::Private, ["private-a", "private-b"])
            .unwrap();
        model
            .add_service("gateway", [80], Visibility::Private, ["private-a"])
            .unwrap();
        model
    }

    #[test]
    fn test_declarations_keep_order() {
        let model = base_model();
        let labels: Vec<&str> = model.subnets().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["private-a", "private-b"]);
        assert_eq!(model.services()[0].name.as_str(), "auth");
        assert_eq!(model.subnets_in("main").count(), 2);
        assert_eq!(
            model.service_network("gateway").map(NetworkName::as_str),
            Some("main")
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut model = base_model();
        assert!(matches!(
            model.add_network("main", "10.1.0.0/16"),
            Err(ValidationError::DuplicateNetwork(_))
        ));
        assert!(matches!(
            model.add_subnet("main", "private-a", "c", Visibility::Private),
            Err(ValidationError::DuplicateSubnet(_))
        ));
        assert!(matches!(
            model.add_service("auth", [1], Visibility::Private, ["private-a"]),
            Err(ValidationError::DuplicateService(_))
        ));
    }

    #[test]
    fn test_malformed_values_rejected() {
        let mut model = base_model();
        assert!(matches!(
            model.add_network("bad", "10.0.0.0/33"),
            Err(ValidationError::InvalidValue(_))
        ));
        assert!(matches!(
            model.add_network("everything", "0.0.0.0/0"),
            Err(ValidationError::ZeroPrefix { .. })
        ));
        assert!(matches!(
            model.add_service("zero", [0], Visibility::Private, ["private-a"]),
            Err(ValidationError::InvalidValue(_))
        ));
        assert!(matches!(
            model.add_intent("gateway", "auth", 0, Protocol::Tcp),
            Err(ValidationError::InvalidValue(_))
        ));
        assert!(matches!(
            model.add_subnet("main", "bad label", "a", Visibility::Public),
            Err(ValidationError::InvalidName(_))
        ));
    }

    #[test]
    fn test_undeclared_references_rejected() {
        let mut model = base_model();
        assert!(matches!(
            model.add_subnet("missing", "x", "a", Visibility::Public),
            Err(ValidationError::UnknownNetwork(_))
        ));
        assert!(matches!(
            model.add_service("db", [3306], Visibility::Private, ["nowhere"]),
            Err(ValidationError::UnknownSubnet(_))
        ));
        assert!(matches!(
            model.add_intent("gateway", "billing", 8080, Protocol::Tcp),
            Err(ValidationError::UnknownService(_))
        ));
        assert!(matches!(
            model.add_network_ingress("other", "auth", 9898, Protocol::Tcp),
            Err(ValidationError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn test_placement_cannot_span_networks() {
        let mut model = base_model();
        model.add_network("edge", "192.168.0.0/24").unwrap();
        model
            .add_subnet("edge", "edge-a", "a", Visibility::Public)
            .unwrap();
        assert!(matches!(
            model.add_service("proxy", [443], Visibility::Public, ["edge-a", "private-a"]),
            Err(ValidationError::PlacementSpansNetworks { .. })
        ));
    }

    #[test]
    fn test_service_ports_and_placement_deduplicated() {
        let mut model = base_model();
        model
            .add_service(
                "kafka",
                [9092, 9092, 2181],
                Visibility::Private,
                ["private-a", "private-a"],
            )
            .unwrap();
        let kafka = model.service("kafka").unwrap();
        assert_eq!(kafka.ports.len(), 2);
        assert_eq!(kafka.placement.len(), 1);
    }

    #[test]
    fn test_empty_placement_is_accepted() {
        let mut model = base_model();
        let empty: [&str; 0] = [];
        model
            .add_service("orphan", [8080], Visibility::Private, empty)
            .unwrap();
        assert!(model.service_network("orphan").is_none());
    }

    #[test]
    fn test_intent_kinds() {
        let mut model = base_model();
        let allow = model.add_intent("gateway", "auth", 9898, Protocol::Tcp).unwrap();
        let deny = model
            .add_deny_intent("auth", "gateway", 80, Protocol::Tcp)
            .unwrap();
        let ingress = model
            .add_network_ingress("main", "auth", 9898, Protocol::Tcp)
            .unwrap();

        assert_eq!(model.intent(allow).unwrap().effect, Effect::Allow);
        assert_eq!(model.intent(deny).unwrap().effect, Effect::Deny);
        assert_eq!(
            model.intent(ingress).unwrap().source,
            Endpoint::Network(NetworkName::new("main").unwrap())
        );
        assert_eq!(
            model.intent(allow).unwrap().to_string(),
            "allow gateway -> auth:9898/tcp"
        );
    }

    #[test]
    fn test_remove_referenced_service_fails() {
        let mut model = base_model();
        model.add_intent("gateway", "auth", 9898, Protocol::Tcp).unwrap();

        assert_eq!(
            model.remove_service("auth"),
            Err(ValidationError::ServiceInUse {
                service: ServiceName::new("auth").unwrap(),
                intents: 1,
            })
        );
        assert!(model.service("auth").is_some());
    }

    #[test]
    fn test_remove_unreferenced_service() {
        let mut model = base_model();
        let removed = model.remove_service("auth").unwrap();
        assert_eq!(removed.name.as_str(), "auth");
        assert!(model.service("auth").is_none());
        assert_eq!(model.service("gateway").unwrap().name.as_str(), "gateway");
        assert!(matches!(
            model.add_intent("gateway", "auth", 9898, Protocol::Tcp),
            Err(ValidationError::UnknownService(_))
        ));
        assert!(matches!(
            model.remove_service("auth"),
            Err(ValidationError::UnknownService(_))
        ));
    }
}
