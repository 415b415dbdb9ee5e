// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subnet Allocator
//!
//! Partitions a network block into non-overlapping subnet blocks.
//!
//! # Algorithm
//!
//! ```text
//! 1. Fixed blocks are carved out of the free space, in declaration order.
//! 2. Each sized request, in declaration order, takes the smallest free block
//!    that can hold it (lowest address on ties) and halves it until the
//!    requested prefix is reached. The upper halves go back to the free list.
//! ```
//!
//! With no fixed blocks the free list holds at most one block per size, so a
//! set of requests whose total fits the parent always succeeds. The result
//! depends only on the input, never on iteration order of internal state.

use std::cmp::Reverse;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Ipv4Cidr, NetworkName, SubnetLabel, SubnetSize};
use crate::topology::NetworkDecl;

/// The parent block cannot satisfy the requested subnets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Network {network} ({parent}) cannot fit {}: requested {requested} addresses, {available} available",
    describe(.subnet)
)]
pub struct CapacityError {
    pub network: NetworkName,
    pub parent: Ipv4Cidr,
    /// The request that failed, or `None` when the total was over capacity
    pub subnet: Option<SubnetLabel>,
    /// Addresses asked for
    pub requested: u64,
    /// Addresses that were left to satisfy the request
    pub available: u64,
}

fn describe(subnet: &Option<SubnetLabel>) -> String {
    match subnet {
        Some(label) => format!("subnet {}", label),
        None => "all subnets".to_string(),
    }
}

/// One subnet to allocate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRequest {
    pub label: SubnetLabel,
    pub size: SubnetSize,
}

impl SubnetRequest {
    pub fn new(label: SubnetLabel, size: SubnetSize) -> Self {
        Self { label, size }
    }
}

/// Result of allocating one network: label to block, in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    assigned: Vec<(SubnetLabel, Ipv4Cidr)>,
    free: Vec<Ipv4Cidr>,
}

impl Allocation {
    /// Block assigned to a subnet label
    pub fn get(&self, label: &str) -> Option<Ipv4Cidr> {
        self.assigned
            .iter()
            .find(|(l, _)| l.as_str() == label)
            .map(|(_, block)| *block)
    }

    /// Assignments in request order
    pub fn iter(&self) -> impl Iterator<Item = (&SubnetLabel, Ipv4Cidr)> + '_ {
        self.assigned.iter().map(|(label, block)| (label, *block))
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Blocks left unassigned, lowest address first
    pub fn free_blocks(&self) -> &[Ipv4Cidr] {
        &self.free
    }

    /// Addresses left unassigned
    pub fn free_addresses(&self) -> u64 {
        self.free.iter().map(Ipv4Cidr::size).sum()
    }
}

/// Allocate blocks for `requests` inside `network`
///
/// Fixed blocks are passed through unchanged, even when they overlap one
/// another; overlaps are reported by the conflict checker rather than here.
/// Overlapping fixed blocks count their shared addresses once toward the
/// capacity total.
///
/// # Errors
/// - Total requested addresses exceed the parent block
/// - A sized request finds no free block large enough
pub fn allocate(
    network: &NetworkDecl,
    requests: &[SubnetRequest],
) -> Result<Allocation, CapacityError> {
    let parent = network.cidr;
    let siblings = requests.len();
    let capacity_error = |subnet: Option<&SubnetLabel>, requested: u64, available: u64| {
        CapacityError {
            network: network.name.clone(),
            parent,
            subnet: subnet.cloned(),
            requested,
            available,
        }
    };

    let prefixes: Vec<u16> = requests
        .iter()
        .map(|r| r.size.resolve_prefix(&parent, siblings))
        .collect();

    let fixed: Vec<Ipv4Cidr> = requests.iter().filter_map(|r| r.size.fixed_block()).collect();
    let sized: u64 = requests
        .iter()
        .zip(&prefixes)
        .filter(|(r, _)| r.size.fixed_block().is_none())
        .map(|(_, &p)| addresses_for(p))
        .sum();
    let total = sized + covered_by(&parent, &fixed);
    if total > parent.size() {
        return Err(capacity_error(None, total, parent.size()));
    }

    let mut free = vec![parent];
    let mut assigned: Vec<Option<Ipv4Cidr>> = vec![None; requests.len()];

    for (slot, request) in requests.iter().enumerate() {
        if let Some(block) = request.size.fixed_block() {
            reserve(&mut free, block);
            debug!("Reserved fixed block {} for {}", block, request.label);
            assigned[slot] = Some(block);
        }
    }

    for (slot, request) in requests.iter().enumerate() {
        if assigned[slot].is_some() {
            continue;
        }

        let prefix = prefixes[slot];
        let available: u64 = free.iter().map(Ipv4Cidr::size).sum();
        if prefix <= u16::from(parent.prefix_len()) || prefix > u16::from(Ipv4Cidr::MAX_PREFIX) {
            return Err(capacity_error(
                Some(&request.label),
                addresses_for(prefix),
                available,
            ));
        }
        let prefix = prefix as u8;

        let Some(block) = take_block(&mut free, prefix) else {
            return Err(capacity_error(
                Some(&request.label),
                addresses_for(u16::from(prefix)),
                available,
            ));
        };

        debug!(
            "Allocated {} to {} in {}",
            block, request.label, network.name
        );
        assigned[slot] = Some(block);
    }

    free.sort();

    Ok(Allocation {
        assigned: requests
            .iter()
            .zip(assigned)
            .filter_map(|(request, block)| block.map(|b| (request.label.clone(), b)))
            .collect(),
        free,
    })
}

/// Addresses covered by a prefix; prefixes past /32 count as one address
fn addresses_for(prefix: u16) -> u64 {
    match prefix {
        p if p >= u16::from(Ipv4Cidr::MAX_PREFIX) => 1,
        p => 1u64 << (u16::from(Ipv4Cidr::MAX_PREFIX) - p),
    }
}

/// Addresses of `parent` covered by at least one of `blocks`
///
/// Blocks nested inside another block are counted once, through the outer
/// block; blocks outside `parent` count for nothing.
fn covered_by(parent: &Ipv4Cidr, blocks: &[Ipv4Cidr]) -> u64 {
    blocks
        .iter()
        .enumerate()
        .filter(|&(i, block)| {
            !blocks
                .iter()
                .enumerate()
                .any(|(j, other)| other.strictly_contains(block) || (j < i && other == block))
        })
        .map(|(_, block)| {
            if parent.contains(block) {
                block.size()
            } else if block.contains(parent) {
                parent.size()
            } else {
                0
            }
        })
        .sum()
}

/// Take a `/prefix` block from the smallest free block that can hold it
fn take_block(free: &mut Vec<Ipv4Cidr>, prefix: u8) -> Option<Ipv4Cidr> {
    let index = free
        .iter()
        .enumerate()
        .filter(|(_, block)| block.prefix_len() <= prefix)
        .min_by_key(|(_, block)| (Reverse(block.prefix_len()), block.first()))
        .map(|(i, _)| i)?;

    let mut current = free.swap_remove(index);
    while current.prefix_len() < prefix {
        let (lower, upper) = current.split()?;
        free.push(upper);
        current = lower;
    }
    Some(current)
}

/// Remove `block` from the free list, splitting any free block that holds it
fn reserve(free: &mut Vec<Ipv4Cidr>, block: Ipv4Cidr) {
    let mut remaining = Vec::with_capacity(free.len() + Ipv4Cidr::MAX_PREFIX as usize);

    for candidate in free.drain(..) {
        if !candidate.overlaps(&block) {
            remaining.push(candidate);
            continue;
        }
        if block.contains(&candidate) {
            continue;
        }

        let mut current = candidate;
        while current != block {
            let Some((lower, upper)) = current.split() else {
                break;
            };
            if lower.contains(&block) {
                remaining.push(upper);
                current = lower;
            } else {
                remaining.push(lower);
                current = upper;
            }
        }
    }

    *free = remaining;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn network(cidr: &str) -> NetworkDecl {
        NetworkDecl {
            name: NetworkName::new("main").unwrap(),
            cidr: cidr.parse().unwrap(),
        }
    }

    fn request(label: &str, size: SubnetSize) -> SubnetRequest {
        SubnetRequest::new(SubnetLabel::new(label).unwrap(), size)
    }

    fn blocks(allocation: &Allocation) -> Vec<String> {
        allocation.iter().map(|(_, b)| b.to_string()).collect()
    }

    #[test]
    fn test_consecutive_equal_blocks() {
        let requests = vec![
            request("public-1", SubnetSize::Prefix(24)),
            request("public-2", SubnetSize::Prefix(24)),
            request("private-1", SubnetSize::Prefix(24)),
            request("private-2", SubnetSize::Prefix(24)),
        ];
        let allocation = allocate(&network("10.0.0.0/16"), &requests).unwrap();

        assert_eq!(
            blocks(&allocation),
            vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]
        );
        assert_eq!(
            allocation.get("private-1").map(|b| b.to_string()),
            Some("10.0.2.0/24".to_string())
        );
        assert_eq!(allocation.free_addresses(), 65_536 - 4 * 256);
    }

    #[test]
    fn test_even_split() {
        let requests = vec![
            request("lower", SubnetSize::Even),
            request("upper", SubnetSize::Even),
        ];
        let allocation = allocate(&network("10.0.0.0/24"), &requests).unwrap();
        assert_eq!(blocks(&allocation), vec!["10.0.0.0/25", "10.0.0.128/25"]);
        assert!(allocation.free_blocks().is_empty());
    }

    #[test]
    fn test_small_request_does_not_waste_large_space() {
        let requests = vec![
            request("small", SubnetSize::Prefix(26)),
            request("large", SubnetSize::Prefix(24)),
            request("medium", SubnetSize::Delta(2)),
        ];
        let allocation = allocate(&network("10.0.0.0/23"), &requests).unwrap();
        assert_eq!(
            blocks(&allocation),
            vec!["10.0.0.0/26", "10.0.1.0/24", "10.0.0.128/25"]
        );
        assert_eq!(
            allocation
                .free_blocks()
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>(),
            vec!["10.0.0.64/26"]
        );
    }

    #[test]
    fn test_fixed_blocks_are_carved_first() {
        let requests = vec![
            request("dynamic", SubnetSize::Prefix(24)),
            request("pinned", SubnetSize::Cidr("10.0.0.0/24".parse().unwrap())),
        ];
        let allocation = allocate(&network("10.0.0.0/16"), &requests).unwrap();
        assert_eq!(blocks(&allocation), vec!["10.0.1.0/24", "10.0.0.0/24"]);
    }

    #[test]
    fn test_overlapping_fixed_blocks_pass_through() {
        let requests = vec![
            request("a", SubnetSize::Cidr("10.0.0.0/24".parse().unwrap())),
            request("b", SubnetSize::Cidr("10.0.0.128/25".parse().unwrap())),
        ];
        let allocation = allocate(&network("10.0.0.0/16"), &requests).unwrap();
        assert_eq!(blocks(&allocation), vec!["10.0.0.0/24", "10.0.0.128/25"]);
    }

    #[test]
    fn test_overlapping_fixed_blocks_count_shared_addresses_once() {
        let requests = vec![
            request("lower", SubnetSize::Cidr("10.0.0.0/17".parse().unwrap())),
            request("upper", SubnetSize::Cidr("10.0.128.0/17".parse().unwrap())),
            request("nested", SubnetSize::Cidr("10.0.0.0/18".parse().unwrap())),
            request("again", SubnetSize::Cidr("10.0.0.0/17".parse().unwrap())),
        ];
        let allocation = allocate(&network("10.0.0.0/16"), &requests).unwrap();
        assert_eq!(allocation.len(), 4);
        assert_eq!(allocation.free_addresses(), 0);
    }

    #[test]
    fn test_fixed_block_outside_parent_takes_no_capacity() {
        let requests = vec![
            request("stray", SubnetSize::Cidr("192.168.0.0/24".parse().unwrap())),
            request("whole", SubnetSize::Even),
        ];
        let allocation = allocate(&network("10.0.0.0/24"), &requests).unwrap();
        assert_eq!(
            allocation.get("whole").map(|b| b.to_string()),
            Some("10.0.0.0/25".to_string())
        );
    }

    #[test]
    fn test_over_capacity_total() {
        let requests = vec![
            request("a", SubnetSize::Prefix(25)),
            request("b", SubnetSize::Prefix(25)),
            request("c", SubnetSize::Prefix(26)),
        ];
        let err = allocate(&network("10.0.0.0/24"), &requests).unwrap_err();
        assert_eq!(err.subnet, None);
        assert_eq!(err.requested, 320);
        assert_eq!(err.available, 256);
        assert_eq!(
            err.to_string(),
            "Network main (10.0.0.0/24) cannot fit all subnets: requested 320 addresses, 256 available"
        );
    }

    #[test]
    fn test_even_split_beyond_single_addresses() {
        let requests: Vec<SubnetRequest> = (0..5)
            .map(|i| request(&format!("s{}", i), SubnetSize::Even))
            .collect();
        let err = allocate(&network("10.0.0.0/30"), &requests).unwrap_err();
        assert_eq!(err.requested, 5);
        assert_eq!(err.available, 4);
    }

    #[test]
    fn test_fragmentation_by_fixed_blocks() {
        let requests = vec![
            request("pin-1", SubnetSize::Cidr("10.0.0.64/26".parse().unwrap())),
            request("pin-2", SubnetSize::Cidr("10.0.0.192/26".parse().unwrap())),
            request("wide", SubnetSize::Prefix(25)),
        ];
        let err = allocate(&network("10.0.0.0/24"), &requests).unwrap_err();
        assert_eq!(err.subnet.as_ref().map(SubnetLabel::as_str), Some("wide"));
        assert_eq!(err.requested, 128);
        assert_eq!(err.available, 128);
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let requests = vec![
            request("a", SubnetSize::Prefix(27)),
            request("b", SubnetSize::Prefix(25)),
            request("c", SubnetSize::Cidr("10.0.0.0/26".parse().unwrap())),
            request("d", SubnetSize::Prefix(28)),
        ];
        let first = allocate(&network("10.0.0.0/24"), &requests).unwrap();
        let second = allocate(&network("10.0.0.0/24"), &requests).unwrap();
        assert_eq!(first, second);
    }
}
