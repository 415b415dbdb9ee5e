// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Topology Invariants
//!
//! Build-time business rules for the topology model. All functions are pure
//! (no side effects) and return detailed validation results. A failed
//! validation aborts the planning run; post-hoc inconsistencies are reported
//! by the conflict checker instead.
//!
//! # Invariant Categories
//!
//! 1. **Structural Invariants**: well-formed names, blocks and ports
//! 2. **Reference Invariants**: every name refers to a declared entity
//! 3. **Containment Invariants**: subnets fit strictly inside their network

use super::name::{NameError, NetworkName, ServiceName, SubnetLabel};
use super::network::{Ipv4Cidr, NetworkError, SubnetSize};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Malformed name
    #[error(transparent)]
    InvalidName(#[from] NameError),

    /// Malformed CIDR, port, protocol, visibility or zone
    #[error(transparent)]
    InvalidValue(#[from] NetworkError),

    /// Network blocks must not cover the whole address space
    #[error("Network {network} has a zero-length prefix ({cidr})")]
    ZeroPrefix { network: NetworkName, cidr: Ipv4Cidr },

    #[error("Network {0} already exists")]
    DuplicateNetwork(NetworkName),

    #[error("Subnet {0} already exists")]
    DuplicateSubnet(SubnetLabel),

    #[error("Service {0} already exists")]
    DuplicateService(ServiceName),

    #[error("Network {0} does not exist")]
    UnknownNetwork(String),

    #[error("Subnet {0} does not exist")]
    UnknownSubnet(String),

    #[error("Service {0} does not exist")]
    UnknownService(String),

    /// Requested subnet size cannot sit strictly inside the parent block
    #[error("Subnet {subnet} in network {network} has invalid size {size}: {reason}")]
    InvalidSubnetSize {
        network: NetworkName,
        subnet: SubnetLabel,
        size: SubnetSize,
        reason: String,
    },

    /// A service must live in exactly one network
    #[error("Service {service} is placed in more than one network: {}", join(.networks))]
    PlacementSpansNetworks {
        service: ServiceName,
        networks: Vec<NetworkName>,
    },

    /// Services referenced by intents cannot be removed
    #[error("Service {service} is referenced by {intents} connectivity intent(s)")]
    ServiceInUse { service: ServiceName, intents: usize },
}

fn join(names: &[NetworkName]) -> String {
    names
        .iter()
        .map(NetworkName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a network address block
///
/// # Rules
/// - Prefix length must be non-zero
pub fn validate_network_block(network: &NetworkName, cidr: &Ipv4Cidr) -> ValidationResult {
    if cidr.prefix_len() == 0 {
        return Err(ValidationError::ZeroPrefix {
            network: network.clone(),
            cidr: *cidr,
        });
    }
    Ok(())
}

/// Validate a subnet size request against its parent block
///
/// # Rules
/// - Resolved prefix is longer than the parent's and at most 32
/// - Fixed blocks lie strictly inside the parent
/// - Even splits need a parent that can still be halved; the final prefix
///   depends on the sibling count and is checked again during allocation
pub fn validate_subnet_size(
    network: &NetworkName,
    subnet: &SubnetLabel,
    parent: &Ipv4Cidr,
    size: &SubnetSize,
) -> ValidationResult {
    let invalid = |reason: String| ValidationError::InvalidSubnetSize {
        network: network.clone(),
        subnet: subnet.clone(),
        size: *size,
        reason,
    };

    if let Some(block) = size.fixed_block() {
        if !parent.strictly_contains(&block) {
            return Err(invalid(format!(
                "{} is not strictly inside {}",
                block, parent
            )));
        }
        return Ok(());
    }

    let prefix = size.resolve_prefix(parent, 1);
    if prefix <= u16::from(parent.prefix_len()) {
        return Err(invalid(format!(
            "prefix /{} is not longer than the parent /{}",
            prefix,
            parent.prefix_len()
        )));
    }
    if prefix > u16::from(Ipv4Cidr::MAX_PREFIX) {
        return Err(invalid(format!("prefix /{} exceeds /32", prefix)));
    }

    Ok(())
}

/// Validate that a service's placement resolves to a single network
///
/// # Rules
/// - Zero or one distinct network across all placement subnets
pub fn validate_single_network(
    service: &ServiceName,
    networks: &[NetworkName],
) -> ValidationResult {
    let mut distinct: Vec<NetworkName> = networks.to_vec();
    distinct.sort();
    distinct.dedup();

    if distinct.len() > 1 {
        return Err(ValidationError::PlacementSpansNetworks {
            service: service.clone(),
            networks: distinct,
        });
    }
    Ok(())
}
