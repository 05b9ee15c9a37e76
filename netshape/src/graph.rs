//! Reachability over a [`PeerMapping`].

use std::collections::{BTreeSet, VecDeque};

use crate::{NodeId, PeerMapping};

/// True when every node is reachable from every other one.
/// An empty mapping has no component and is not connected.
pub fn is_connected(mapping: &PeerMapping) -> bool {
    match mapping.nodes().next() {
        None => false,
        Some(root) => reachable_from(mapping, root).len() == mapping.len(),
    }
}

/// Connected components, ordered by their lowest node id.
pub fn components(mapping: &PeerMapping) -> Vec<BTreeSet<NodeId>> {
    let mut seen = BTreeSet::new();
    let mut components = Vec::new();
    for id in mapping.nodes() {
        if seen.contains(&id) {
            continue;
        }
        let component = reachable_from(mapping, id);
        seen.extend(component.iter().copied());
        components.push(component);
    }
    components
}

fn reachable_from(mapping: &PeerMapping, root: NodeId) -> BTreeSet<NodeId> {
    let mut visited = BTreeSet::from([root]);
    let mut queue = VecDeque::from([root]);

    while let Some(curr) = queue.pop_front() {
        for &peer in mapping.peers(curr).into_iter().flatten() {
            if visited.insert(peer) {
                queue.push_back(peer);
            }
        }
    }

    visited
}
