// Copyright (c) 2025 - Cowboy AI, Inc.
//! Planner configuration
//!
//! Read from the environment by the `topology-plan` binary:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `TOPOLOGY_INPUT` | input document path (first CLI argument wins) | required |
//! | `TOPOLOGY_OUTPUT` | plan output path | stdout |
//! | `TOPOLOGY_ALLOW_CONFLICTS` | emit an unvalidated plan despite conflicts | `false` |

use std::path::PathBuf;

use crate::errors::{PlannerError, PlannerResult};

pub const INPUT_VAR: &str = "TOPOLOGY_INPUT";
pub const OUTPUT_VAR: &str = "TOPOLOGY_OUTPUT";
pub const ALLOW_CONFLICTS_VAR: &str = "TOPOLOGY_ALLOW_CONFLICTS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Topology document to plan
    pub input: PathBuf,
    /// Where to write the plan, stdout when `None`
    pub output: Option<PathBuf>,
    /// Write the plan even when the checker reports conflicts
    pub allow_conflicts: bool,
}

impl PlannerConfig {
    /// Load configuration from the process environment and arguments
    pub fn from_env() -> PlannerResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok(), std::env::args().nth(1))
    }

    /// Load configuration through `lookup`, with `argument` overriding the input path
    pub fn from_vars<F>(lookup: F, argument: Option<String>) -> PlannerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let input = argument
            .or_else(|| lookup(INPUT_VAR))
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                PlannerError::Configuration(format!(
                    "no input document: pass a path or set {}",
                    INPUT_VAR
                ))
            })?;

        let output = lookup(OUTPUT_VAR)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        let allow_conflicts = match lookup(ALLOW_CONFLICTS_VAR) {
            None => false,
            Some(value) => parse_flag(&value).ok_or_else(|| {
                PlannerError::Configuration(format!(
                    "{} must be true or false, got {:?}",
                    ALLOW_CONFLICTS_VAR, value
                ))
            })?,
        };

        Ok(Self {
            input,
            output,
            allow_conflicts,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
