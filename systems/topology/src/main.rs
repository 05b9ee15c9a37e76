use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    process::exit,
};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, error::ErrorKind};
use log::info;
use netshape::{NodeId, PeerMapping, TopologyBuilder, graph, manifest::Manifest, persistence};

/// Generates a random connected peer topology, or summarizes a saved one.
#[derive(Parser, Debug)]
#[command(name = "topology")]
struct Args {
    /// `NUM_NODES MIN_PEERS MAX_PEERS` to generate, or the PATH of a saved topology.
    #[arg(required = true, num_args = 1..=3, value_name = "ARGS")]
    args: Vec<String>,

    /// Seed of the generator. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Attempts before giving up on a connected topology.
    #[arg(long, default_value_t = 1000)]
    max_attempts: usize,

    /// Reject topologies leaving any node under MIN_PEERS.
    #[arg(long)]
    require_floor: bool,

    /// Directory receiving `topology_<id>.json`.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write the testnet manifest records to this file.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Nodes receiving load in the manifest. All of them when empty.
    #[arg(long, value_delimiter = ',')]
    load_nodes: Vec<NodeId>,
}

enum Mode {
    Generate {
        num_nodes: usize,
        min_peers: usize,
        max_peers: usize,
    },
    Load(PathBuf),
}

fn parse_mode(args: &[String]) -> Result<Mode, clap::Error> {
    match args {
        [path] => Ok(Mode::Load(PathBuf::from(path))),
        [num_nodes, min_peers, max_peers] => Ok(Mode::Generate {
            num_nodes: parse_count("NUM_NODES", num_nodes)?,
            min_peers: parse_count("MIN_PEERS", min_peers)?,
            max_peers: parse_count("MAX_PEERS", max_peers)?,
        }),
        _ => Err(Args::command().error(
            ErrorKind::WrongNumberOfValues,
            "expected `NUM_NODES MIN_PEERS MAX_PEERS` or a single PATH",
        )),
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize, clap::Error> {
    value.parse().map_err(|_| {
        Args::command().error(
            ErrorKind::ValueValidation,
            format!("{name} must be a non-negative integer, got `{value}`"),
        )
    })
}

fn main() -> Result<()> {
    netshape::init_logger();

    let args = Args::parse();
    let mode = parse_mode(&args.args).unwrap_or_else(|e| e.exit());

    let peers = match mode {
        Mode::Generate {
            num_nodes,
            min_peers,
            max_peers,
        } => generate_and_save(&args, num_nodes, min_peers, max_peers)?,
        Mode::Load(path) => load_and_summarize(&path)?,
    };

    if let Some(path) = &args.manifest {
        let load_nodes: BTreeSet<NodeId> = args.load_nodes.iter().copied().collect();
        Manifest::from_peers(&peers, &load_nodes)?
            .save(path)
            .with_context(|| format!("writing manifest {}", path.display()))?;
        info!("Manifest written to {}", path.display());
    }

    Ok(())
}

fn generate_and_save(
    args: &Args,
    num_nodes: usize,
    min_peers: usize,
    max_peers: usize,
) -> Result<PeerMapping> {
    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Generating {num_nodes} nodes with {min_peers}..={max_peers} peers, seed {seed}");

    let topology = TopologyBuilder::default()
        .nodes(num_nodes)
        .min_peers(min_peers)
        .max_peers(max_peers)
        .max_attempts(args.max_attempts)
        .require_floor(args.require_floor)
        .seed(seed)
        .generate()?;

    if topology.is_empty() {
        eprintln!("MAX_PEERS ({max_peers}) must not be lower than MIN_PEERS ({min_peers})");
        exit(1);
    }

    println!("# num_connections: {}", topology.connections);
    println!("# num connections per node: {:?}", topology.peers.degrees());

    let path = persistence::save_to_dir(&topology.peers, &args.out_dir, &topology.id)?;
    println!("{}", path.display());

    Ok(topology.peers)
}

fn load_and_summarize(path: &Path) -> Result<PeerMapping> {
    let peers = persistence::load(path)?;
    let degrees = peers.degrees();

    println!("# nodes: {}", peers.len());
    println!("# num_connections: {}", peers.edge_count());
    println!("# num connections per node: {degrees:?}");
    if let (Some(min), Some(max)) = (degrees.iter().min(), degrees.iter().max()) {
        println!("# degree range: {min}..={max}");
    }
    println!("# components: {}", graph::components(&peers).len());
    println!("# graph id: {}", peers.graph_id());

    Ok(peers)
}
