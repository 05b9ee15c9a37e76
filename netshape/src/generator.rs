//! Random connected peer topologies.
//!
//! An attempt builds the mapping in two passes over the nodes in ascending
//! id order. The floor pass brings every node up to `min_peers` choosing
//! among nodes that are still under that floor; the relaxation pass then
//! draws a target degree in `[min_peers, max_peers]` per node and tops it up
//! choosing among nodes under `max_peers`. Partners are sampled uniformly
//! without replacement. A node keeps fewer peers than asked when the
//! candidate pool runs dry.
//!
//! Attempts that end up disconnected are thrown away whole and a fresh one
//! starts from the same random stream, up to the retry budget.
//!
//! Earlier ids get first pick of partners in both passes, so low ids lean
//! towards higher degrees.

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    GraphId, NodeId, PeerMapping, graph,
    progress::Bar,
    random::{Randomizer, Seed},
};

const DEFAULT_NUM_NODES: usize = 16;
const DEFAULT_MIN_PEERS: usize = 2;
const DEFAULT_MAX_PEERS: usize = 5;
const DEFAULT_SEED: Seed = 69;
const DEFAULT_MAX_ATTEMPTS: usize = 1000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("a topology needs at least one node")]
    NoNodes,

    #[error(
        "no connected topology of {num_nodes} nodes with {min_peers}..={max_peers} peers per node after {attempts} attempts"
    )]
    Unsatisfiable {
        num_nodes: usize,
        min_peers: usize,
        max_peers: usize,
        attempts: usize,
    },
}

/// Per-node degree bounds, shared by every node of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegreeBounds {
    pub min_peers: usize,
    pub max_peers: usize,
}

impl DegreeBounds {
    pub fn new(min_peers: usize, max_peers: usize) -> Self {
        Self {
            min_peers,
            max_peers,
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.max_peers < self.min_peers
    }
}

/// Outcome of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTopology {
    pub peers: PeerMapping,
    /// Undirected links created by the accepted attempt.
    pub connections: usize,
    pub id: GraphId,
    /// Attempts it took, the accepted one included.
    pub attempts: usize,
}

impl GeneratedTopology {
    /// Returned for inverted degree bounds.
    pub fn empty() -> Self {
        Self {
            peers: PeerMapping::new(),
            connections: 0,
            id: GraphId::default(),
            attempts: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

pub struct TopologyBuilder {
    num_nodes: usize,
    bounds: DegreeBounds,
    seed: Seed,
    max_attempts: usize,
    require_floor: bool,
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        TopologyBuilder {
            num_nodes: DEFAULT_NUM_NODES,
            bounds: DegreeBounds::new(DEFAULT_MIN_PEERS, DEFAULT_MAX_PEERS),
            seed: DEFAULT_SEED,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            require_floor: false,
        }
    }
}

impl TopologyBuilder {
    pub fn nodes(mut self, num_nodes: usize) -> Self {
        self.num_nodes = num_nodes;
        self
    }

    pub fn min_peers(mut self, min_peers: usize) -> Self {
        self.bounds.min_peers = min_peers;
        self
    }

    pub fn max_peers(mut self, max_peers: usize) -> Self {
        self.bounds.max_peers = max_peers;
        self
    }

    pub fn bounds(mut self, bounds: DegreeBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Also reject attempts that leave some node under `min_peers`.
    pub fn require_floor(mut self, require_floor: bool) -> Self {
        self.require_floor = require_floor;
        self
    }

    pub fn generate(self) -> Result<GeneratedTopology, GenerateError> {
        let DegreeBounds {
            min_peers,
            max_peers,
        } = self.bounds;

        if self.bounds.is_inverted() {
            warn!("max_peers ({max_peers}) is lower than min_peers ({min_peers}), nothing generated");
            return Ok(GeneratedTopology::empty());
        }
        if self.num_nodes == 0 {
            return Err(GenerateError::NoNodes);
        }

        let unsatisfiable = |attempts| GenerateError::Unsatisfiable {
            num_nodes: self.num_nodes,
            min_peers,
            max_peers,
            attempts,
        };

        // Nobody may take a peer, so more than one node can never be connected.
        if max_peers == 0 && self.num_nodes > 1 {
            return Err(unsatisfiable(0));
        }

        let mut randomizer = Randomizer::new(self.seed);
        let mut progress_bar = Bar::new(self.max_attempts);

        for attempt in 1..=self.max_attempts {
            let (peers, connections) = build_attempt(self.num_nodes, self.bounds, &mut randomizer);
            progress_bar.make_progress(attempt);

            if !graph::is_connected(&peers) {
                debug!("Attempt {attempt} is not connected, retrying");
                continue;
            }
            if self.require_floor && peers.degrees().iter().any(|&d| d < min_peers) {
                debug!("Attempt {attempt} leaves nodes under {min_peers} peers, retrying");
                continue;
            }

            progress_bar.finish();
            if attempt > 1 {
                info!("Connected topology found after {attempt} attempts");
            }
            let id = peers.graph_id();
            return Ok(GeneratedTopology {
                peers,
                connections,
                id,
                attempts: attempt,
            });
        }

        progress_bar.finish();
        Err(unsatisfiable(self.max_attempts))
    }
}

/// Seeded generation with the default retry budget.
pub fn generate(
    num_nodes: usize,
    min_peers: usize,
    max_peers: usize,
    seed: Seed,
) -> Result<GeneratedTopology, GenerateError> {
    TopologyBuilder::default()
        .nodes(num_nodes)
        .min_peers(min_peers)
        .max_peers(max_peers)
        .seed(seed)
        .generate()
}

fn build_attempt(
    num_nodes: usize,
    bounds: DegreeBounds,
    randomizer: &mut Randomizer,
) -> (PeerMapping, usize) {
    let mut peers = PeerMapping::with_nodes(num_nodes);
    let mut connections = 0;

    for id in 1..=num_nodes {
        connections += connect_up_to(
            &mut peers,
            id,
            bounds.min_peers,
            bounds.min_peers,
            randomizer,
        );
    }

    for id in 1..=num_nodes {
        let target = randomizer.random_in_range(bounds.min_peers, bounds.max_peers);
        connections += connect_up_to(&mut peers, id, target, bounds.max_peers, randomizer);
    }

    (peers, connections)
}

// Links `id` with random nodes holding fewer than `candidate_bound` peers
// until it reaches `target` or runs out of candidates.
fn connect_up_to(
    peers: &mut PeerMapping,
    id: NodeId,
    target: usize,
    candidate_bound: usize,
    randomizer: &mut Randomizer,
) -> usize {
    let missing = target.saturating_sub(peers.degree(id));
    if missing == 0 {
        return 0;
    }

    let candidates: Vec<NodeId> = peers
        .nodes()
        .filter(|&other| {
            other != id && !peers.is_linked(id, other) && peers.degree(other) < candidate_bound
        })
        .collect();

    let chosen = randomizer.sample_distinct(&candidates, missing.min(candidates.len()));
    for &other in &chosen {
        peers.connect(id, other);
    }
    chosen.len()
}
