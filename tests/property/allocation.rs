// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Subnet Allocation
//!
//! Sized requests that fit the parent are always satisfied, never overlap,
//! and always land strictly inside the parent.

use proptest::prelude::*;
use std::net::Ipv4Addr;

use topology_planner::allocator::{allocate, SubnetRequest};
use topology_planner::domain::{Ipv4Cidr, NetworkName, SubnetLabel, SubnetSize};
use topology_planner::topology::NetworkDecl;

// ============================================================================
// Strategies
// ============================================================================

/// A parent prefix and a list of absolute request prefixes below it
fn parent_and_prefixes() -> impl Strategy<Value = (u8, Vec<u8>)> {
    (8u8..=24).prop_flat_map(|parent| {
        let deepest = (parent + 8).min(Ipv4Cidr::MAX_PREFIX);
        (
            Just(parent),
            prop::collection::vec(parent + 1..=deepest, 1..12),
        )
    })
}

fn network(prefix: u8) -> NetworkDecl {
    NetworkDecl {
        name: NetworkName::new("main").unwrap(),
        cidr: Ipv4Cidr::new(Ipv4Addr::new(10, 0, 0, 0), prefix).unwrap(),
    }
}

fn requests(prefixes: &[u8]) -> Vec<SubnetRequest> {
    prefixes
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            SubnetRequest::new(
                SubnetLabel::new(format!("s{}", i)).unwrap(),
                SubnetSize::Prefix(p),
            )
        })
        .collect()
}

/// Longest leading run of `prefixes` whose total fits `capacity`
fn fitting(prefixes: &[u8], capacity: u64) -> Vec<u8> {
    let mut used = 0;
    prefixes
        .iter()
        .copied()
        .take_while(|&p| {
            used += 1u64 << (32 - u32::from(p));
            used <= capacity
        })
        .collect()
}

fn total(prefixes: &[u8]) -> u64 {
    prefixes.iter().map(|&p| 1u64 << (32 - u32::from(p))).sum()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_fitting_requests_are_disjoint_and_contained((parent, prefixes) in parent_and_prefixes()) {
        let network = network(parent);
        let prefixes = fitting(&prefixes, network.cidr.size());

        let allocation = allocate(&network, &requests(&prefixes)).unwrap();
        let blocks: Vec<Ipv4Cidr> = allocation.iter().map(|(_, b)| b).collect();

        prop_assert_eq!(blocks.len(), prefixes.len());
        for (block, &prefix) in blocks.iter().zip(&prefixes) {
            prop_assert_eq!(block.prefix_len(), prefix);
            prop_assert!(network.cidr.strictly_contains(block));
        }
        for (i, a) in blocks.iter().enumerate() {
            for b in &blocks[i + 1..] {
                prop_assert!(!a.overlaps(b), "{} overlaps {}", a, b);
            }
        }
        prop_assert_eq!(
            allocation.free_addresses() + total(&prefixes),
            network.cidr.size()
        );
    }

    #[test]
    fn prop_allocation_fails_only_when_over_capacity((parent, prefixes) in parent_and_prefixes()) {
        let network = network(parent);
        let result = allocate(&network, &requests(&prefixes));

        prop_assert_eq!(result.is_ok(), total(&prefixes) <= network.cidr.size());
        if let Err(err) = result {
            prop_assert_eq!(err.requested, total(&prefixes));
            prop_assert_eq!(err.available, network.cidr.size());
        }
    }

    #[test]
    fn prop_allocation_is_deterministic((parent, prefixes) in parent_and_prefixes()) {
        let network = network(parent);
        let requests = requests(&prefixes);

        prop_assert_eq!(allocate(&network, &requests), allocate(&network, &requests));
    }

    #[test]
    fn prop_even_split_covers_parent(parent in 8u8..=24, count in 1usize..16) {
        let network = network(parent);
        let requests: Vec<SubnetRequest> = (0..count)
            .map(|i| {
                SubnetRequest::new(SubnetLabel::new(format!("s{}", i)).unwrap(), SubnetSize::Even)
            })
            .collect();

        let allocation = allocate(&network, &requests).unwrap();
        let prefixes: Vec<u8> = allocation.iter().map(|(_, b)| b.prefix_len()).collect();

        prop_assert!(prefixes.windows(2).all(|w| w[0] == w[1]));
        prop_assert!(prefixes[0] > parent);
        prop_assert!(allocation.free_addresses() < network.cidr.size() / 2 || count == 1);
    }
}
