// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Rule Derivation
//!
//! Derivation depends only on the set of intents: duplicates and declaration
//! order never change the rules, and every symmetric pair collapses into
//! exactly one bidirectional rule per endpoint.

use proptest::prelude::*;
use std::collections::BTreeSet;

use topology_planner::domain::{Protocol, Visibility};
use topology_planner::rules::{derive, Direction};
use topology_planner::topology::TopologyModel;

const SERVICES: [&str; 4] = ["auth", "gateway", "kafka", "mysql"];
const PORTS: [u16; 3] = [80, 3306, 9092];

type Intent = (usize, usize, u16, bool);

// ============================================================================
// Strategies
// ============================================================================

fn intent() -> impl Strategy<Value = Intent> {
    (
        0..SERVICES.len(),
        0..SERVICES.len(),
        prop::sample::select(PORTS.to_vec()),
        any::<bool>(),
    )
}

fn model(intents: &[Intent]) -> TopologyModel {
    let mut model = TopologyModel::new();
    model.add_network("main", "10.0.0.0/16").unwrap();
    model
        .add_subnet("main", "private-a", "a", Visibility::Private)
        .unwrap();
    model
        .add_subnet("main", "private-b", "b", Visibility::Private)
        .unwrap();
    for name in SERVICES {
        model
            .add_service(name, PORTS, Visibility::Private, ["private-a", "private-b"])
            .unwrap();
    }
    for &(src, dst, port, udp) in intents {
        let protocol = if udp { Protocol::Udp } else { Protocol::Tcp };
        model
            .add_intent(SERVICES[src], SERVICES[dst], port, protocol)
            .unwrap();
    }
    model
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_rule_count_matches_distinct_intents(intents in prop::collection::vec(intent(), 0..24)) {
        let distinct: BTreeSet<Intent> = intents.iter().copied().collect();
        let expected: usize = distinct
            .iter()
            .map(|&(src, dst, port, udp)| {
                if distinct.contains(&(dst, src, port, udp)) { 1 } else { 2 }
            })
            .sum();

        prop_assert_eq!(derive(&model(&intents)).len(), expected);
    }

    #[test]
    fn prop_symmetric_pair_is_bidirectional(
        a in 0..SERVICES.len(),
        b in 0..SERVICES.len(),
        port in prop::sample::select(PORTS.to_vec()),
    ) {
        prop_assume!(a != b);
        let rules = derive(&model(&[(a, b, port, false), (b, a, port, false)]));

        prop_assert_eq!(rules.len(), 2);
        prop_assert!(rules.iter().all(|r| r.direction == Direction::Bidirectional));
        let sources: BTreeSet<&str> = rules.iter().map(|r| r.source.name()).collect();
        prop_assert_eq!(sources, BTreeSet::from([SERVICES[a], SERVICES[b]]));
    }

    #[test]
    fn prop_derivation_ignores_order_and_duplicates(
        intents in prop::collection::vec(intent(), 1..16)
            .prop_flat_map(|v| {
                let doubled: Vec<Intent> = v.iter().chain(v.iter()).copied().collect();
                (Just(v), Just(doubled).prop_shuffle())
            })
    ) {
        let (original, shuffled) = intents;
        prop_assert_eq!(derive(&model(&original)), derive(&model(&shuffled)));
    }

    #[test]
    fn prop_rules_are_sorted(intents in prop::collection::vec(intent(), 0..24)) {
        let rules = derive(&model(&intents));
        let keys: Vec<(&str, &str, u16)> = rules
            .iter()
            .map(|r| (r.source.name(), r.destination.name(), r.port.value()))
            .collect();

        prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(rules.iter().all(|r| r.boundary().is_some()));
    }
}
