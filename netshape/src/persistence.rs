//! JSON files holding a [`PeerMapping`].
//!
//! ```json
//! {
//!   "1": [2, 3],
//!   "2": [1],
//!   "3": [1]
//! }
//! ```
//!
//! Keys are node ids written as strings in ascending numeric order, values
//! are ascending peer ids. Loading checks that the result is a valid
//! mapping: distinct positive ids, no self-loops, every link present in
//! both directions.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt, fs, io,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};
use thiserror::Error;

use crate::{GraphId, NodeId, PeerMapping};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed topology: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node id `{0}` is not a positive integer")]
    InvalidNodeId(String),

    #[error("node {0} is listed twice")]
    DuplicateNode(NodeId),

    #[error("node {0} lists itself as a peer")]
    SelfLoop(NodeId),

    #[error("node {node} lists peer {peer} which is not a node")]
    UnknownPeer { node: NodeId, peer: NodeId },

    #[error("node {node} lists peer {peer} but not the other way around")]
    Asymmetric { node: NodeId, peer: NodeId },
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("topology file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to decode {}: {source}", .path.display())]
    Decode { path: PathBuf, source: DecodeError },

    #[error("failed to access {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl PersistError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            PersistError::NotFound(path.to_path_buf())
        } else {
            PersistError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

pub fn to_json_string(mapping: &PeerMapping) -> Result<String, DecodeError> {
    Ok(serde_json::to_string_pretty(mapping)?)
}

pub fn from_json_str(json: &str) -> Result<PeerMapping, DecodeError> {
    let records: Records = serde_json::from_str(json)?;
    records.into_mapping()
}

pub fn save(mapping: &PeerMapping, path: &Path) -> Result<(), PersistError> {
    let json = to_json_string(mapping).map_err(|source| PersistError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json + "\n").map_err(|e| PersistError::io(path, e))?;
    debug!("Saved {} nodes to {}", mapping.len(), path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<PeerMapping, PersistError> {
    let json = fs::read_to_string(path).map_err(|e| PersistError::io(path, e))?;
    from_json_str(&json).map_err(|source| PersistError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

pub fn file_name(id: &GraphId) -> String {
    format!("topology_{id}.json")
}

/// Saves as `topology_<id>.json` under `dir` and returns the path written.
pub fn save_to_dir(mapping: &PeerMapping, dir: &Path, id: &GraphId) -> Result<PathBuf, PersistError> {
    let path = dir.join(file_name(id));
    save(mapping, &path)?;
    Ok(path)
}

// Raw entries in file order. A plain map would silently keep only the last
// of two equal keys.
struct Records(Vec<(String, Vec<NodeId>)>);

impl<'de> Deserialize<'de> for Records {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordsVisitor;

        impl<'de> Visitor<'de> for RecordsVisitor {
            type Value = Records;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping node ids to lists of peer ids")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Records, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Vec<NodeId>>()? {
                    entries.push(entry);
                }
                Ok(Records(entries))
            }
        }

        deserializer.deserialize_map(RecordsVisitor)
    }
}

impl Records {
    fn into_mapping(self) -> Result<PeerMapping, DecodeError> {
        let mut adjacency: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();

        for (key, peers) in self.0 {
            let id = parse_node_id(&key)?;
            if adjacency.insert(id, peers.into_iter().collect()).is_some() {
                return Err(DecodeError::DuplicateNode(id));
            }
        }

        for (&node, peers) in &adjacency {
            for &peer in peers {
                if peer == node {
                    return Err(DecodeError::SelfLoop(node));
                }
                match adjacency.get(&peer) {
                    None => return Err(DecodeError::UnknownPeer { node, peer }),
                    Some(back) if !back.contains(&node) => {
                        return Err(DecodeError::Asymmetric { node, peer });
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(PeerMapping::from_adjacency(adjacency))
    }
}

fn parse_node_id(key: &str) -> Result<NodeId, DecodeError> {
    match key.trim().parse::<NodeId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(DecodeError::InvalidNodeId(key.to_string())),
    }
}
