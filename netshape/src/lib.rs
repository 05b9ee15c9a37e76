mod alloc;
pub mod generator;
pub mod graph;
pub mod latency;
mod logging;
pub mod manifest;
mod peers;
pub mod persistence;
mod progress;
mod random;

pub use generator::DegreeBounds;
pub use generator::GenerateError;
pub use generator::GeneratedTopology;
pub use generator::TopologyBuilder;
pub use generator::generate;

pub use logging::init_logger;

pub use peers::GraphId;
pub use peers::NodeId;
pub use peers::PeerMapping;

pub use random::Randomizer;
pub use random::Seed;
