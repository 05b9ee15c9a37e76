use std::{fs::File, io::Read, net::IpAddr, path::Path};

use serde::Deserialize;

use super::LatencyError;

/// One row of the IP/zone table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneEntry {
    #[serde(rename = "Node")]
    pub node: String,
    #[serde(rename = "IP")]
    pub ip: IpAddr,
    #[serde(rename = "Zone")]
    pub zone: String,
}

/// Hosts of the testnet with the zone each one lives in. Read from a csv
/// file whose header names the `Node`, `IP` and `Zone` columns.
#[derive(Debug, Clone, Default)]
pub struct IpZoneTable {
    entries: Vec<ZoneEntry>,
}

impl IpZoneTable {
    pub fn new(entries: Vec<ZoneEntry>) -> Self {
        Self { entries }
    }

    pub fn from_path(path: &Path) -> Result<Self, LatencyError> {
        let file = File::open(path).map_err(|source| LatencyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, origin: &str) -> Result<Self, LatencyError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let entries = reader
            .deserialize()
            .collect::<Result<Vec<ZoneEntry>, _>>()
            .map_err(|source| LatencyError::Csv {
                origin: origin.to_string(),
                source,
            })?;
        Ok(Self { entries })
    }

    pub fn lookup(&self, ip: IpAddr) -> Option<&ZoneEntry> {
        self.entries.iter().find(|entry| entry.ip == ip)
    }

    pub fn in_zone<'a>(&'a self, zone: &'a str) -> impl Iterator<Item = &'a ZoneEntry> {
        self.entries.iter().filter(move |entry| entry.zone == zone)
    }

    pub fn entries(&self) -> &[ZoneEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
