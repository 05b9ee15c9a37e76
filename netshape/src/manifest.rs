//! Testnet manifest records derived from a peer mapping.
//!
//! Every node becomes a `[node.validatorNNN]` table listing its persistent
//! peers by name. When a set of load nodes is given, only those receive
//! synthetic load and every other node is marked `send_no_load`.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{NodeId, PeerMapping};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("load node {0} is not part of the topology")]
    UnknownNode(NodeId),

    #[error("failed to encode manifest: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

pub fn node_name(id: NodeId) -> String {
    format!("validator{id:03}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestNode {
    pub persistent_peers: Vec<String>,
    pub send_no_load: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub node: BTreeMap<String, ManifestNode>,
}

impl Manifest {
    pub fn from_peers(
        peers: &PeerMapping,
        load_nodes: &BTreeSet<NodeId>,
    ) -> Result<Self, ManifestError> {
        if let Some(&unknown) = load_nodes.iter().find(|id| !peers.contains(**id)) {
            return Err(ManifestError::UnknownNode(unknown));
        }

        let node = peers
            .iter()
            .map(|(id, links)| {
                let record = ManifestNode {
                    persistent_peers: links.iter().map(|&peer| node_name(peer)).collect(),
                    send_no_load: !load_nodes.is_empty() && !load_nodes.contains(&id),
                };
                (node_name(id), record)
            })
            .collect();

        Ok(Self { node })
    }

    pub fn to_toml_string(&self) -> Result<String, ManifestError> {
        Ok(toml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        fs::write(path, self.to_toml_string()?).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
