// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants
//!
//! Address blocks, ports and placement attributes used by the topology model.
//! Every value object validates on construction, so a value that exists is a
//! value that is well formed.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4)")]
    InvalidPrefixLength(u8),

    #[error("Host bits set in {given} (network address is {expected})")]
    HostBitsSet { given: String, expected: String },

    #[error("Invalid port: {0} (must be 1-65535)")]
    InvalidPort(u32),

    #[error("Invalid protocol: {0} (expected tcp or udp)")]
    InvalidProtocol(String),

    #[error("Invalid visibility: {0} (expected public or private)")]
    InvalidVisibility(String),

    #[error("Invalid zone label: {0:?}")]
    InvalidZone(String),
}

/// IPv4 address block in CIDR notation
///
/// Wraps an [`Ipv4Net`] and adds the invariant that host bits are zero, so
/// every block is stored by its network address.
///
/// Blocks order by network address first, then by prefix length, so sorting
/// a set of blocks walks the address space from low to high.
///
/// # Examples
///
/// ```rust
/// use topology_planner::domain::Ipv4Cidr;
///
/// let block: Ipv4Cidr = "10.0.0.0/16".parse().unwrap();
/// assert_eq!(block.size(), 65_536);
/// assert!(block.contains(&"10.0.3.0/24".parse().unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr(Ipv4Net);

impl Ipv4Cidr {
    /// Longest IPv4 prefix
    pub const MAX_PREFIX: u8 = 32;

    /// Create a block from its network address and prefix length
    ///
    /// # Invariants
    /// - Prefix length 0-32
    /// - `address` has no bits set below the prefix
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, NetworkError> {
        let net = Ipv4Net::new(address, prefix_len)
            .map_err(|_| NetworkError::InvalidPrefixLength(prefix_len))?;

        let truncated = net.trunc();
        if truncated != net {
            return Err(NetworkError::HostBitsSet {
                given: net.to_string(),
                expected: truncated.to_string(),
            });
        }

        Ok(Self(net))
    }

    /// `0.0.0.0/0`, the default-route destination
    pub fn any() -> Self {
        Self(Ipv4Net::default())
    }

    /// Network address of the block
    pub fn address(&self) -> Ipv4Addr {
        self.0.network()
    }

    /// Prefix length of the block
    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }

    /// Number of addresses covered by the block
    pub fn size(&self) -> u64 {
        1u64 << (Self::MAX_PREFIX - self.prefix_len())
    }

    /// First address of the block
    pub fn first(&self) -> Ipv4Addr {
        self.0.network()
    }

    /// Last address of the block
    pub fn last(&self) -> Ipv4Addr {
        self.0.broadcast()
    }

    /// Whether `other` lies entirely inside this block (equal blocks included)
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        self.0.contains(&other.0)
    }

    /// Whether `other` lies inside this block and is smaller than it
    pub fn strictly_contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_len() > self.prefix_len() && self.contains(other)
    }

    /// Whether the two blocks share any address
    ///
    /// CIDR blocks are either nested or disjoint, so overlap reduces to
    /// containment in one direction or the other.
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// Halve the block into its lower and upper children
    ///
    /// Returns `None` for a single-address `/32` block.
    pub fn split(&self) -> Option<(Ipv4Cidr, Ipv4Cidr)> {
        if self.prefix_len() == Self::MAX_PREFIX {
            return None;
        }

        let mut halves = self.0.subnets(self.prefix_len() + 1).ok()?;
        let lower = halves.next()?;
        let upper = halves.next()?;
        Some((Self(lower), Self(upper)))
    }

    /// Get as CIDR notation string
    pub fn as_cidr(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cidr())
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, prefix_str) = s
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(s.to_string()))?;

        let address = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_len = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(s.to_string()))?;

        Self::new(address, prefix_len)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.as_cidr()
    }
}

/// Requested size of a subnet within its parent network
///
/// Serialized externally tagged: `{"prefix": 24}`, `{"delta": 8}`,
/// `{"cidr": "10.0.4.0/24"}` or `"even"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetSize {
    /// Absolute prefix length, like a `cidrMask` of 24
    Prefix(u8),
    /// Prefix-length delta from the parent block
    Delta(u8),
    /// A fixed, caller-chosen block
    Cidr(Ipv4Cidr),
    /// The parent split evenly among all of its subnets
    #[default]
    Even,
}

impl SubnetSize {
    /// Resolve the request to an absolute prefix length
    ///
    /// `siblings` is the number of subnets declared in the parent, which only
    /// matters for [`SubnetSize::Even`]: the parent is halved
    /// `ceil(log2(siblings))` times, and at least once so the subnet stays
    /// strictly inside its parent. The result may exceed 32; callers reject it.
    pub fn resolve_prefix(&self, parent: &Ipv4Cidr, siblings: usize) -> u16 {
        let parent_prefix = u16::from(parent.prefix_len());
        match self {
            SubnetSize::Prefix(p) => u16::from(*p),
            SubnetSize::Delta(d) => parent_prefix + u16::from(*d),
            SubnetSize::Cidr(block) => u16::from(block.prefix_len()),
            SubnetSize::Even => {
                let halvings = siblings.max(2).next_power_of_two().trailing_zeros();
                parent_prefix + halvings as u16
            }
        }
    }

    /// The fixed block, if the caller chose one
    pub fn fixed_block(&self) -> Option<Ipv4Cidr> {
        match self {
            SubnetSize::Cidr(block) => Some(*block),
            _ => None,
        }
    }
}

impl fmt::Display for SubnetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetSize::Prefix(p) => write!(f, "/{}", p),
            SubnetSize::Delta(d) => write!(f, "+{}", d),
            SubnetSize::Cidr(block) => write!(f, "{}", block),
            SubnetSize::Even => write!(f, "even"),
        }
    }
}

/// Transport port value object (1-65535)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Create a port, rejecting the reserved port 0
    pub fn new(port: u16) -> Result<Self, NetworkError> {
        if port == 0 {
            return Err(NetworkError::InvalidPort(0));
        }
        Ok(Self(port))
    }

    /// Get the port number
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Port {
    type Error = NetworkError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let port = u16::try_from(value).map_err(|_| NetworkError::InvalidPort(value))?;
        Self::new(port)
    }
}

impl TryFrom<u16> for Port {
    type Error = NetworkError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Port> for u16 {
    fn from(value: Port) -> Self {
        value.0
    }
}

/// Transport protocol of a connectivity intent
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            _ => Err(NetworkError::InvalidProtocol(s.to_string())),
        }
    }
}

/// Whether a subnet or service faces the internet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

impl FromStr for Visibility {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(NetworkError::InvalidVisibility(s.to_string())),
        }
    }
}

/// Availability zone label (e.g. `"a"`, `"eu-west-1b"`, `"0"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Zone(String);

impl Zone {
    /// Create a zone label
    ///
    /// # Invariants
    /// - Not empty
    /// - No whitespace
    pub fn new(zone: impl Into<String>) -> Result<Self, NetworkError> {
        let zone = zone.into();
        if zone.is_empty() || zone.chars().any(char::is_whitespace) {
            return Err(NetworkError::InvalidZone(zone));
        }
        Ok(Self(zone))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Zone {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Zone {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Zone> for String {
    fn from(value: Zone) -> Self {
        value.0
    }
}
