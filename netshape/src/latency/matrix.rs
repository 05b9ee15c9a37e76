use std::{collections::HashMap, fs::File, io::Read, path::Path};

use super::LatencyError;

/// Latency in milliseconds from a source zone (row) to a destination zone
/// (column). Directions are independent. Only positive cells are kept, so a
/// missing pair means the link is not shaped.
///
/// ```text
/// from/to,us-east,eu-west
/// us-east,0,80.5
/// eu-west,81.2,0
/// ```
#[derive(Debug, Clone, Default)]
pub struct ZoneLatencyMatrix {
    zones: Vec<String>,
    latencies: HashMap<(String, String), f64>,
}

impl ZoneLatencyMatrix {
    pub fn from_path(path: &Path) -> Result<Self, LatencyError> {
        let file = File::open(path).map_err(|source| LatencyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, origin: &str) -> Result<Self, LatencyError> {
        let csv_error = |source| LatencyError::Csv {
            origin: origin.to_string(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = reader.records();

        // First cell of the header only labels the axes.
        let header = records
            .next()
            .ok_or_else(|| LatencyError::EmptyMatrix(origin.to_string()))?
            .map_err(csv_error)?;
        let zones: Vec<String> = header.iter().skip(1).map(str::to_string).collect();

        let mut latencies = HashMap::new();
        for record in records {
            let record = record.map_err(csv_error)?;
            let Some(from_zone) = record.get(0) else {
                continue;
            };
            for (to_zone, cell) in zones.iter().zip(record.iter().skip(1)) {
                if cell.is_empty() {
                    continue;
                }
                let value = cell
                    .parse::<f64>()
                    .ok()
                    .filter(|v| !v.is_nan())
                    .ok_or_else(|| LatencyError::InvalidLatency {
                        from_zone: from_zone.to_string(),
                        to_zone: to_zone.clone(),
                        value: cell.to_string(),
                    })?;
                if value > 0.0 {
                    latencies.insert((from_zone.to_string(), to_zone.clone()), value);
                }
            }
        }

        Ok(Self { zones, latencies })
    }

    pub fn set(&mut self, from_zone: &str, to_zone: &str, latency_ms: f64) {
        if !self.zones.iter().any(|z| z == to_zone) {
            self.zones.push(to_zone.to_string());
        }
        let key = (from_zone.to_string(), to_zone.to_string());
        if latency_ms > 0.0 {
            self.latencies.insert(key, latency_ms);
        } else {
            self.latencies.remove(&key);
        }
    }

    /// Destination zones in column order.
    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    pub fn latency(&self, from_zone: &str, to_zone: &str) -> Option<f64> {
        self.latencies
            .get(&(from_zone.to_string(), to_zone.to_string()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ZoneLatencyMatrix, LatencyError> {
        ZoneLatencyMatrix::from_reader(text.as_bytes(), "inline")
    }

    #[test]
    fn reads_rows_as_sources() {
        let matrix = parse("from/to,a,b,c\na,0,10,20.5\nb,11,0,30\nc,21,31,0\n").unwrap();
        assert_eq!(matrix.zones(), ["a", "b", "c"]);
        assert_eq!(matrix.latency("a", "c"), Some(20.5));
        assert_eq!(matrix.latency("c", "a"), Some(21.0));
        assert_eq!(matrix.latency("b", "b"), None);
        assert_eq!(matrix.latency("a", "a"), None);
    }

    #[test]
    fn blank_missing_and_negative_cells_are_unshaped() {
        let matrix = parse("from/to,a,b,c\na,,-5\nb,7\n").unwrap();
        assert_eq!(matrix.latency("a", "a"), None);
        assert_eq!(matrix.latency("a", "b"), None);
        assert_eq!(matrix.latency("a", "c"), None);
        assert_eq!(matrix.latency("b", "a"), Some(7.0));
        assert_eq!(matrix.latency("b", "c"), None);
    }

    #[test]
    fn unknown_zones_are_unshaped() {
        let matrix = parse("from/to,a\na,3\n").unwrap();
        assert_eq!(matrix.latency("z", "a"), None);
    }

    #[test]
    fn non_numeric_cell_is_an_error() {
        let err = parse("from/to,a,b\na,0,fast\n").unwrap_err();
        assert!(matches!(
            err,
            LatencyError::InvalidLatency { ref value, .. } if value == "fast"
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse("").unwrap_err(), LatencyError::EmptyMatrix(_)));
    }

    #[test]
    fn set_overrides_cells() {
        let mut matrix = parse("from/to,a,b\na,0,4\n").unwrap();
        matrix.set("a", "b", 0.0);
        matrix.set("a", "c", 9.0);
        assert_eq!(matrix.latency("a", "b"), None);
        assert_eq!(matrix.latency("a", "c"), Some(9.0));
        assert_eq!(matrix.zones(), ["a", "b", "c"]);
    }
}
