// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for topology-planner
//!
//! Deterministic models shared by the integration and property tests.

#![allow(dead_code)]

use topology_planner::domain::{Protocol, SubnetSize, Visibility};
use topology_planner::topology::TopologyModel;
use topology_planner::TopologyDocument;

/// Sample document describing the expense tracker deployment
pub const EXPENSE_TRACKER: &str = include_str!("../../topologies/expense-tracker.json");

pub fn expense_tracker() -> TopologyDocument {
    TopologyDocument::from_json(EXPENSE_TRACKER).expect("Invalid sample document")
}

/// `10.0.0.0/16` with two /24 subnets, `auth` and `gateway`, and
/// `gateway -> auth:9898/tcp`
pub fn auth_gateway_model() -> TopologyModel {
    let mut model = TopologyModel::new();
    model
        .add_network("main", "10.0.0.0/16")
        .expect("Invalid network");
    model
        .add_subnet_sized("main", "private-a", "a", Visibility::Private, SubnetSize::Prefix(24))
        .expect("Invalid subnet");
    model
        .add_subnet_sized("main", "private-b", "b", Visibility::Private, SubnetSize::Prefix(24))
        .expect("Invalid subnet");
    model
        .add_service("auth", [9898], Visibility::Private, ["private-a", "private-b"])
        .expect("Invalid service");
    model
        .add_service("gateway", [80], Visibility::Private, ["private-a"])
        .expect("Invalid service");
    model
        .add_intent("gateway", "auth", 9898, Protocol::Tcp)
        .expect("Invalid intent");
    model
}

/// A network with one subnet per zone on each side, public and private
pub fn two_zone_model() -> TopologyModel {
    let mut model = TopologyModel::new();
    model
        .add_network("vpc", "10.0.0.0/16")
        .expect("Invalid network");
    for (label, zone, visibility) in [
        ("public-1", "a", Visibility::Public),
        ("public-2", "b", Visibility::Public),
        ("private-1", "a", Visibility::Private),
        ("private-2", "b", Visibility::Private),
    ] {
        model
            .add_subnet_sized("vpc", label, zone, visibility, SubnetSize::Prefix(24))
            .expect("Invalid subnet");
    }
    model
}
