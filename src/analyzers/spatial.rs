use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::utils::coordinates::{fusion_bin, fusion_bin_value};

/// Running spatial means over coordinate bins.
///
/// An explicit accumulator passed through the aggregation instead of
/// module-level state: callers `add` samples as they stream by and
/// `finalize` performs the single division pass at the end.
#[derive(Debug, Default)]
pub struct SpatialAccumulator {
    cells: HashMap<(i64, i64), (f64, usize)>,
}

/// Mean value of one coordinate bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialMean {
    pub latitude: f64,
    pub longitude: f64,
    pub mean: f64,
    pub count: usize,
}

impl SpatialAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, latitude: f64, longitude: f64, value: f64) {
        if !value.is_finite() {
            return;
        }
        let cell = self
            .cells
            .entry((fusion_bin(latitude), fusion_bin(longitude)))
            .or_insert((0.0, 0));
        cell.0 += value;
        cell.1 += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Divide once per cell and emit the means in deterministic bin order.
    pub fn finalize(self) -> Vec<SpatialMean> {
        let mut cells: Vec<_> = self.cells.into_iter().collect();
        cells.sort_by_key(|(key, _)| *key);
        cells
            .into_iter()
            .map(|((lat_bin, lon_bin), (sum, count))| SpatialMean {
                latitude: fusion_bin_value(lat_bin),
                longitude: fusion_bin_value(lon_bin),
                mean: sum / count as f64,
                count,
            })
            .collect()
    }
}

/// Aggregate statistics of one value series, written as a JSON summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl SeriesSummary {
    /// `None` when no finite value is present.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;

        for value in values {
            if !value.is_finite() {
                continue;
            }
            count += 1;
            min = min.min(value);
            max = max.max(value);
            sum += value;
        }

        if count == 0 {
            return None;
        }
        Some(Self {
            count,
            min,
            max,
            mean: sum / count as f64,
        })
    }
}

/// Write an analysis summary as pretty-printed JSON.
pub fn write_summary_json<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| crate::error::FusionError::InvalidFormat(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_means_per_bin() {
        let mut acc = SpatialAccumulator::new();
        // Two samples in the (41.8, 13.6) bin, one elsewhere
        acc.add(41.84, 13.62, 290.0);
        acc.add(41.76, 13.58, 294.0);
        acc.add(48.3, -105.1, 260.0);
        acc.add(41.8, 13.6, f64::NAN); // ignored

        let means = acc.finalize();
        assert_eq!(means.len(), 2);

        let cell = means.iter().find(|m| m.latitude == 41.8).unwrap();
        assert_eq!(cell.mean, 292.0);
        assert_eq!(cell.count, 2);
        assert_eq!(cell.longitude, 13.6);
    }

    #[test]
    fn test_finalize_order_is_deterministic() {
        let mut acc = SpatialAccumulator::new();
        acc.add(48.3, -105.1, 1.0);
        acc.add(41.8, 13.6, 2.0);

        let means = acc.finalize();
        assert!(means[0].latitude < means[1].latitude);
    }

    #[test]
    fn test_series_summary() {
        let summary =
            SeriesSummary::from_values([290.0, 270.0, f64::NAN, 310.0]).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 270.0);
        assert_eq!(summary.max, 310.0);
        assert_eq!(summary.mean, 290.0);

        assert!(SeriesSummary::from_values([f64::NAN]).is_none());
        assert!(SeriesSummary::from_values([]).is_none());
    }

    #[test]
    fn test_summary_json_written() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("analysis").join("lst_summary.json");

        let summary = SeriesSummary::from_values([280.0, 300.0]).unwrap();
        write_summary_json(&path, &summary).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"count\": 2"));
        assert!(text.contains("\"mean\": 290.0"));
    }
}
