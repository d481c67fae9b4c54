use crate::core::io::error::IoError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistogramError {
    #[error("Invalid bins: start {start}, stop {stop}, width {width} (need at least two edges)")]
    InvalidBins { start: f64, stop: f64, width: f64 },

    #[error("Ensemble id {id} is outside the {count} histogram series")]
    EnsembleOutOfRange { id: usize, count: usize },

    #[error("Failed to write histogram: {source}")]
    Io {
        #[from]
        source: IoError,
    },
}

/// Evenly spaced bin edges `start, start + width, …` strictly below `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BinSpec {
    pub start: f64,
    pub stop: f64,
    pub width: f64,
}

impl BinSpec {
    pub fn edges(&self) -> Result<Vec<f64>, HistogramError> {
        let invalid = || HistogramError::InvalidBins {
            start: self.start,
            stop: self.stop,
            width: self.width,
        };
        if !(self.start.is_finite() && self.stop.is_finite() && self.width.is_finite())
            || self.width <= 0.0
            || self.stop <= self.start
        {
            return Err(invalid());
        }

        let count = ((self.stop - self.start) / self.width).ceil() as usize;
        if count < 2 {
            return Err(invalid());
        }
        Ok((0..count)
            .map(|i| self.start + i as f64 * self.width)
            .collect())
    }
}

/// Multiplicity-weighted energy histogram, in total and per ensemble multiset.
///
/// Bins are half-open `[lo, hi)` except the last one, which also includes its
/// upper edge. Values outside the edges are not counted.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    edges: Vec<f64>,
    labels: Vec<String>,
    total: Vec<u64>,
    per_ensemble: Vec<Vec<u64>>,
}

impl Histogram {
    /// One series per entry of `labels`.
    pub fn new(bins: &BinSpec, labels: Vec<String>) -> Result<Self, HistogramError> {
        let edges = bins.edges()?;
        let n_bins = edges.len() - 1;
        Ok(Self {
            per_ensemble: vec![vec![0; n_bins]; labels.len()],
            total: vec![0; n_bins],
            labels,
            edges,
        })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn total(&self) -> &[u64] {
        &self.total
    }

    pub fn ensemble(&self, id: usize) -> Option<&[u64]> {
        self.per_ensemble.get(id).map(Vec::as_slice)
    }

    pub fn bin_index(&self, value: f64) -> Option<usize> {
        bin_of(&self.edges, value)
    }

    /// Adds `weight` to the bin of `value`; returns whether the value was in range.
    pub fn add(&mut self, ensemble_id: usize, value: f64, weight: u64) -> Result<bool, HistogramError> {
        let count = self.per_ensemble.len();
        let series = self
            .per_ensemble
            .get_mut(ensemble_id)
            .ok_or(HistogramError::EnsembleOutOfRange {
                id: ensemble_id,
                count,
            })?;
        let Some(bin) = bin_of(&self.edges, value) else {
            return Ok(false);
        };
        series[bin] += weight;
        self.total[bin] += weight;
        Ok(true)
    }

    /// Writes `bin_start,bin_stop,total,<label>…` rows, one per bin.
    pub fn write_csv(&self, path: &Path) -> Result<(), HistogramError> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| IoError::csv(path, e))?;

        let mut header = vec![
            "bin_start".to_string(),
            "bin_stop".to_string(),
            "total".to_string(),
        ];
        header.extend(self.labels.iter().cloned());
        writer
            .write_record(&header)
            .map_err(|e| IoError::csv(path, e))?;

        for (bin, bounds) in self.edges.windows(2).enumerate() {
            let mut record = vec![
                format!("{:.5}", bounds[0]),
                format!("{:.5}", bounds[1]),
                self.total[bin].to_string(),
            ];
            record.extend(self.per_ensemble.iter().map(|series| series[bin].to_string()));
            writer
                .write_record(&record)
                .map_err(|e| IoError::csv(path, e))?;
        }
        writer.flush().map_err(|e| IoError::io(path, e))?;
        Ok(())
    }
}

fn bin_of(edges: &[f64], value: f64) -> Option<usize> {
    let first = *edges.first()?;
    let last = *edges.last()?;
    if value.is_nan() || value < first || value > last {
        return None;
    }
    if value == last {
        return Some(edges.len() - 2);
    }
    Some(edges.partition_point(|&edge| edge <= value) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn bins() -> BinSpec {
        BinSpec {
            start: -1.0,
            stop: 1.0,
            width: 0.5,
        }
    }

    fn labels() -> Vec<String> {
        vec!["Pt".to_string(), "Ru".to_string()]
    }

    #[test]
    fn edges_follow_arange_and_exclude_stop() {
        assert_eq!(bins().edges().unwrap(), vec![-1.0, -0.5, 0.0, 0.5]);
        let uneven = BinSpec {
            start: 0.0,
            stop: 1.1,
            width: 0.5,
        };
        assert_eq!(uneven.edges().unwrap(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn degenerate_bins_are_rejected() {
        let zero_width = BinSpec {
            width: 0.0,
            ..bins()
        };
        assert!(matches!(
            zero_width.edges(),
            Err(HistogramError::InvalidBins { .. })
        ));
        let single_edge = BinSpec {
            start: 0.0,
            stop: 0.4,
            width: 0.5,
        };
        assert!(single_edge.edges().is_err());
    }

    #[test]
    fn last_bin_is_closed_and_outliers_are_skipped() {
        let histogram = Histogram::new(&bins(), labels()).unwrap();
        assert_eq!(histogram.bin_index(-1.0), Some(0));
        assert_eq!(histogram.bin_index(-0.5), Some(1));
        assert_eq!(histogram.bin_index(0.49), Some(2));
        assert_eq!(histogram.bin_index(0.5), Some(2));
        assert_eq!(histogram.bin_index(0.51), None);
        assert_eq!(histogram.bin_index(-1.01), None);
        assert_eq!(histogram.bin_index(f64::NAN), None);
    }

    #[test]
    fn weights_accumulate_per_ensemble_and_in_total() {
        let mut histogram = Histogram::new(&bins(), labels()).unwrap();
        assert!(histogram.add(0, -0.75, 6).unwrap());
        assert!(histogram.add(1, -0.6, 1).unwrap());
        assert!(histogram.add(1, 0.2, 3).unwrap());
        assert!(!histogram.add(0, 5.0, 100).unwrap());

        assert_eq!(histogram.total(), &[7, 0, 3]);
        assert_eq!(histogram.ensemble(0), Some(&[6, 0, 0][..]));
        assert_eq!(histogram.ensemble(1), Some(&[1, 0, 3][..]));
        assert!(matches!(
            histogram.add(2, 0.0, 1),
            Err(HistogramError::EnsembleOutOfRange { id: 2, count: 2 })
        ));
    }

    #[test]
    fn csv_has_header_and_one_row_per_bin() {
        let mut histogram = Histogram::new(&bins(), labels()).unwrap();
        histogram.add(1, 0.0, 2).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("hist.csv");
        histogram.write_csv(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "bin_start,bin_stop,total,Pt,Ru");
        assert_eq!(lines[3], "0.00000,0.50000,2,0,2");
        assert_eq!(lines.len(), 4);
    }
}
