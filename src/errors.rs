// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for planning runs

use thiserror::Error;

use crate::allocator::CapacityError;
use crate::domain::ValidationError;

/// Errors that can stop a planning run
///
/// Conflicts are not errors; they are collected by the checker and returned
/// alongside the plan.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// A declaration broke a model invariant
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A network cannot hold its subnets
    #[error("Capacity error: {0}")]
    Capacity(#[from] CapacityError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for planning runs
pub type PlannerResult<T> = Result<T, PlannerError>;

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        PlannerError::Serialization(err.to_string())
    }
}
