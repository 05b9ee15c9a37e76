use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display, Write},
};

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

pub type NodeId = usize;

const GRAPH_ID_LEN: usize = 10;

/// Short stable identifier of a peer mapping, derived from its canonical encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(String);

impl GraphId {
    pub fn of(mapping: &PeerMapping) -> Self {
        let digest = Sha256::digest(mapping.canonical_encoding().as_bytes());
        let mut id = hex::encode(digest);
        id.truncate(GRAPH_ID_LEN);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Undirected adjacency: every node maps to the set of its peers.
///
/// Links are always inserted in both directions and a node is never its own
/// peer, so the mapping stays symmetric and free of self-loops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerMapping {
    peers: BTreeMap<NodeId, BTreeSet<NodeId>>, // btree for deterministic iterators
}

impl PeerMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes `1..=num_nodes`, none of them connected.
    pub fn with_nodes(num_nodes: usize) -> Self {
        Self {
            peers: (1..=num_nodes).map(|id| (id, BTreeSet::new())).collect(),
        }
    }

    /// Caller guarantees symmetry and the absence of self-loops.
    pub(crate) fn from_adjacency(peers: BTreeMap<NodeId, BTreeSet<NodeId>>) -> Self {
        Self { peers }
    }

    pub fn add_node(&mut self, id: NodeId) -> bool {
        if self.peers.contains_key(&id) {
            return false;
        }
        self.peers.insert(id, BTreeSet::new());
        true
    }

    /// Links `a` and `b` in both directions, adding missing nodes.
    /// Returns false for self-loops and links that already exist.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b || self.is_linked(a, b) {
            return false;
        }
        self.peers.entry(a).or_default().insert(b);
        self.peers.entry(b).or_default().insert(a);
        true
    }

    pub fn is_linked(&self, a: NodeId, b: NodeId) -> bool {
        self.peers.get(&a).is_some_and(|peers| peers.contains(&b))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn peers(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.peers.get(&id)
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.peers.get(&id).map_or(0, BTreeSet::len)
    }

    /// Degrees in ascending node order.
    pub fn degrees(&self) -> Vec<usize> {
        self.peers.values().map(BTreeSet::len).collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.peers.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &BTreeSet<NodeId>)> {
        self.peers.iter().map(|(id, peers)| (*id, peers))
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.peers.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// `<id>:<peer>,<peer>;` for every node, ascending at both levels.
    pub fn canonical_encoding(&self) -> String {
        let mut encoding = String::new();
        for (id, peers) in &self.peers {
            let _ = write!(encoding, "{id}:");
            for (i, peer) in peers.iter().enumerate() {
                if i > 0 {
                    encoding.push(',');
                }
                let _ = write!(encoding, "{peer}");
            }
            encoding.push(';');
        }
        encoding
    }

    pub fn graph_id(&self) -> GraphId {
        GraphId::of(self)
    }
}

// Keys are written as strings in numeric order, peers as ascending arrays.
impl Serialize for PeerMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.peers.iter().map(|(id, peers)| (id.to_string(), peers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_is_symmetric() {
        let mut mapping = PeerMapping::with_nodes(3);
        assert!(mapping.connect(1, 3));
        assert!(mapping.is_linked(1, 3));
        assert!(mapping.is_linked(3, 1));
        assert!(!mapping.connect(3, 1));
        assert_eq!(mapping.edge_count(), 1);
        assert_eq!(mapping.degrees(), vec![1, 0, 1]);
    }

    #[test]
    fn self_loops_are_refused() {
        let mut mapping = PeerMapping::with_nodes(2);
        assert!(!mapping.connect(2, 2));
        assert_eq!(mapping.degree(2), 0);
    }

    #[test]
    fn canonical_encoding_is_sorted() {
        let mut mapping = PeerMapping::with_nodes(4);
        mapping.connect(4, 1);
        mapping.connect(2, 1);
        assert_eq!(mapping.canonical_encoding(), "1:2,4;2:1;3:;4:1;");
    }

    #[test]
    fn graph_id_ignores_insertion_order() {
        let mut a = PeerMapping::with_nodes(5);
        a.connect(1, 2);
        a.connect(3, 5);
        a.connect(2, 4);

        let mut b = PeerMapping::new();
        for id in (1..=5).rev() {
            b.add_node(id);
        }
        b.connect(4, 2);
        b.connect(5, 3);
        b.connect(2, 1);

        assert_eq!(a.graph_id(), b.graph_id());
        assert_eq!(a.graph_id().as_str().len(), GRAPH_ID_LEN);

        b.connect(1, 5);
        assert_ne!(a.graph_id(), b.graph_id());
    }
}
