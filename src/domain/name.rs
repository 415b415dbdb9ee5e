// Copyright (c) 2025 - Cowboy AI, Inc.
//! Name Value Objects
//!
//! Networks, subnets and services are referenced by name throughout the
//! topology model and in the emitted plan. Names follow DNS-label rules so
//! they can be reused verbatim as resource identifiers by provisioning tools.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("{kind} name is empty")]
    Empty { kind: &'static str },

    #[error("{kind} name exceeds maximum length of 63 characters: {name}")]
    TooLong { kind: &'static str, name: String },

    #[error("Invalid character {ch:?} in {kind} name {name:?}")]
    InvalidCharacter {
        kind: &'static str,
        name: String,
        ch: char,
    },

    #[error("{kind} name cannot start or end with a hyphen: {name}")]
    InvalidFormat { kind: &'static str, name: String },
}

/// Maximum length of any name (one DNS label)
pub const MAX_NAME_LENGTH: usize = 63;

/// Validate a name against DNS-label rules
///
/// # Invariants
/// - 1-63 characters
/// - ASCII alphanumerics, hyphens and underscores only
/// - No leading or trailing hyphen
fn validate_name(kind: &'static str, name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty { kind });
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(NameError::TooLong {
            kind,
            name: name.to_string(),
        });
    }

    if let Some(ch) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
    {
        return Err(NameError::InvalidCharacter {
            kind,
            name: name.to_string(),
            ch,
        });
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(NameError::InvalidFormat {
            kind,
            name: name.to_string(),
        });
    }

    Ok(())
}

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a validated name
            pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
                let name = name.into();
                validate_name($kind, &name)?;
                Ok(Self(name))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = NameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = NameError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

name_type!(
    /// Name of a network (one address block, e.g. a VPC)
    NetworkName,
    "network"
);

name_type!(
    /// Label of a subnet, unique across the whole topology
    SubnetLabel,
    "subnet"
);

name_type!(
    /// Name of a service
    ServiceName,
    "service"
);
