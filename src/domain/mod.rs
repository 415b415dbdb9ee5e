// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Domain Models
//!
//! Value objects with validation invariants shared by every planning stage.
//!
//! # Value Objects with Invariants
//!
//! - [`NetworkName`], [`SubnetLabel`], [`ServiceName`] - DNS-label names
//! - [`Ipv4Cidr`] - IPv4 block in canonical CIDR notation
//! - [`SubnetSize`] - Requested subnet size (prefix, delta, fixed block, even split)
//! - [`Port`] - Transport port (1-65535)
//! - [`Protocol`], [`Visibility`], [`Zone`] - Placement attributes
//!
//! # Invariants
//!
//! - [`ValidationError`] - Build-time rule violations, see [`invariants`]

pub mod invariants;
pub mod name;
pub mod network;

// Re-export value objects
pub use invariants::{ValidationError, ValidationResult};
pub use name::{NameError, NetworkName, ServiceName, SubnetLabel};
pub use network::{Ipv4Cidr, NetworkError, Port, Protocol, SubnetSize, Visibility, Zone};
