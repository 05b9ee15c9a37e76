//! Zone based latency emulation with traffic control rules.
//!
//! A host looks itself up in the IP/zone table, reads the latency from its
//! zone to every other zone off the matrix and installs one shaping class
//! per destination zone. Traffic to the hosts of a zone is filtered into
//! that zone's class.

mod delay;
mod interface;
mod matrix;
mod plan;
mod runner;
mod zones;

use std::{io, net::IpAddr, path::PathBuf};

use thiserror::Error;

pub use delay::DelayModel;
pub use interface::interface_ipv4;
pub use matrix::ZoneLatencyMatrix;
pub use plan::{FIRST_CLASS_HANDLE, ShapingClass, ShapingPlan, TcCommand, unset_commands};
pub use runner::{CommandRunner, DryRunRunner, SystemRunner, apply};
pub use zones::{IpZoneTable, ZoneEntry};

#[derive(Debug, Error)]
pub enum LatencyError {
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed csv in {origin}: {source}")]
    Csv { origin: String, source: csv::Error },

    #[error("latency matrix in {0} has no header row")]
    EmptyMatrix(String),

    #[error("invalid latency `{value}` from {from_zone} to {to_zone}")]
    InvalidLatency {
        from_zone: String,
        to_zone: String,
        value: String,
    },

    #[error("invalid delay of {0}ms")]
    InvalidDelay(f64),

    #[error("failed to list interface addresses: {0}")]
    InterfaceLookup(#[from] nix::Error),

    #[error("IP address not found for {0}")]
    InterfaceAddressNotFound(String),

    #[error("no zone configured for node {0}")]
    ZoneNotFound(IpAddr),

    #[error("`{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },
}
