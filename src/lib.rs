// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network topology and service connectivity planner
//!
//! Turns declarative descriptions of networks, subnets, services and the
//! connections between them into a concrete plan: non-overlapping subnet
//! blocks, directional access rules, default routes, and a list of every
//! conflict that would make the plan unsafe to apply.
//!
//! ```rust
//! use topology_planner::domain::{Protocol, Visibility};
//! use topology_planner::planner::run;
//! use topology_planner::topology::TopologyModel;
//!
//! let mut model = TopologyModel::new();
//! model.add_network("main", "10.0.0.0/16").unwrap();
//! model.add_subnet("main", "private-a", "a", Visibility::Private).unwrap();
//! model.add_subnet("main", "private-b", "b", Visibility::Private).unwrap();
//! model.add_service("auth", [9898], Visibility::Private, ["private-a", "private-b"]).unwrap();
//! model.add_service("gateway", [80], Visibility::Private, ["private-a"]).unwrap();
//! model.add_intent("gateway", "auth", 9898, Protocol::Tcp).unwrap();
//!
//! let outcome = run(&model).unwrap();
//! assert!(outcome.is_clean());
//! assert_eq!(outcome.plan.rules.len(), 2);
//! ```

pub mod allocator;
pub mod checker;
pub mod config;
pub mod document;
pub mod domain;
pub mod errors;
pub mod plan;
pub mod planner;
pub mod routing;
pub mod rules;
pub mod topology;

// Re-export commonly used types
pub use allocator::{allocate, Allocation, CapacityError, SubnetRequest};
pub use checker::{check, validate, Conflict, ConflictKind, ValidatedPlan};
pub use config::PlannerConfig;
pub use document::TopologyDocument;
pub use errors::{PlannerError, PlannerResult};
pub use plan::{emit, emit_validated, Plan, PlanWarning, SerializedPlan};
pub use planner::{run, run_document, PlanOutcome};
pub use routing::{plan_routes, RouteEntry, RouteTarget};
pub use rules::{derive, AccessRule, Direction, RuleDeriver, Selector};
pub use topology::{ConnectivityIntent, Effect, Endpoint, IntentHandle, TopologyModel};
