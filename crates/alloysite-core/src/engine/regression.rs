use crate::core::io::error::IoError;
use crate::core::utils::combinatorics::multiset_count;
use crate::engine::config::ModelConfig;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Singular values below this fraction of the largest one count as zero.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegressionError {
    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Normal equations are singular: rank {rank} for {columns} free columns")]
    SingularMatrix { rank: usize, columns: usize },

    #[error("Invalid fingerprint layout: {0}")]
    InvalidLayout(&'static str),
}

/// Fitted linear weights together with the column mask they apply to.
///
/// `coefficients[i]` belongs to fingerprint column `retained[i]`; columns listed in
/// `dropped` were zero in every training sample and contribute nothing.
/// `group_means` holds, for every count zone, the mean that was moved from the
/// zone's coefficients into the ensemble coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightRecord", into = "WeightRecord")]
pub struct WeightVector {
    coefficients: Vec<f64>,
    retained: Vec<usize>,
    dropped: Vec<usize>,
    n_columns: usize,
    group_means: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct WeightRecord {
    n_columns: usize,
    retained: Vec<usize>,
    dropped: Vec<usize>,
    coefficients: Vec<f64>,
    group_means: Vec<f64>,
}

impl TryFrom<WeightRecord> for WeightVector {
    type Error = String;

    fn try_from(record: WeightRecord) -> Result<Self, Self::Error> {
        if record.coefficients.len() != record.retained.len() {
            return Err(format!(
                "{} coefficients for {} retained columns",
                record.coefficients.len(),
                record.retained.len()
            ));
        }
        let mut columns: Vec<usize> = record.retained.iter().chain(&record.dropped).copied().collect();
        columns.sort_unstable();
        if !columns.iter().copied().eq(0..record.n_columns) {
            return Err(format!(
                "retained and dropped columns do not partition 0..{}",
                record.n_columns
            ));
        }
        if !record.retained.windows(2).all(|w| w[0] < w[1]) {
            return Err("retained columns must be strictly increasing".to_string());
        }
        Ok(WeightVector {
            coefficients: record.coefficients,
            retained: record.retained,
            dropped: record.dropped,
            n_columns: record.n_columns,
            group_means: record.group_means,
        })
    }
}

impl From<WeightVector> for WeightRecord {
    fn from(weights: WeightVector) -> Self {
        WeightRecord {
            n_columns: weights.n_columns,
            retained: weights.retained,
            dropped: weights.dropped,
            coefficients: weights.coefficients,
            group_means: weights.group_means,
        }
    }
}

impl WeightVector {
    /// Weights over every column, with nothing dropped.
    #[cfg(test)]
    pub(crate) fn dense(coefficients: Vec<f64>) -> Self {
        Self {
            retained: (0..coefficients.len()).collect(),
            dropped: Vec::new(),
            n_columns: coefficients.len(),
            group_means: Vec::new(),
            coefficients,
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn retained(&self) -> &[usize] {
        &self.retained
    }

    pub fn dropped(&self) -> &[usize] {
        &self.dropped
    }

    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    pub fn group_means(&self) -> &[f64] {
        &self.group_means
    }

    /// Coefficient of fingerprint column `column`; dropped columns weigh zero.
    pub fn weight(&self, column: usize) -> Option<f64> {
        if column >= self.n_columns {
            return None;
        }
        Some(
            self.retained
                .binary_search(&column)
                .map_or(0.0, |position| self.coefficients[position]),
        )
    }

    /// Predicted energy of one fingerprint.
    pub fn predict_one(&self, row: &[u32]) -> Result<f64, RegressionError> {
        if row.len() != self.n_columns {
            return Err(RegressionError::DimensionMismatch {
                expected: self.n_columns,
                found: row.len(),
            });
        }
        Ok(self.dot(row))
    }

    /// Predicted energies of many fingerprints, row-parallel with `parallel`.
    pub fn predict(&self, rows: &[Vec<u32>]) -> Result<Vec<f64>, RegressionError> {
        #[cfg(not(feature = "parallel"))]
        let iterator = rows.iter();

        #[cfg(feature = "parallel")]
        let iterator = rows.par_iter();

        iterator.map(|row| self.predict_one(row)).collect()
    }

    /// Dot product over the retained columns. `row` must have `n_columns` entries.
    pub(crate) fn dot(&self, row: &[u32]) -> f64 {
        self.retained
            .iter()
            .zip(&self.coefficients)
            .map(|(&column, &weight)| f64::from(row[column]) * weight)
            .sum()
    }

    pub fn save(&self, path: &Path) -> Result<(), IoError> {
        let content = toml::to_string_pretty(self).map_err(|e| IoError::TomlSerialize {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        std::fs::write(path, content).map_err(|e| IoError::io(path, e))
    }

    pub fn load(path: &Path) -> Result<Self, IoError> {
        let content = std::fs::read_to_string(path).map_err(|e| IoError::io(path, e))?;
        toml::from_str(&content).map_err(|e| IoError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }
}

/// Least-squares fit of per-zone, per-metal coefficients.
///
/// The ensemble one-hot block always sums to one and every count zone sums to its
/// size, so the raw normal equations are singular. Inside each count zone whose
/// retained columns sum to a constant, the last retained column is held at zero
/// while solving. The solution is then gauge fixed: each count zone's coefficients
/// are shifted to zero mean and the removed amount (times the zone size) is added
/// to every ensemble coefficient, which leaves all predictions unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetricLeastSquares {
    metal_count: usize,
    zone_sizes: Vec<usize>,
}

impl SymmetricLeastSquares {
    pub fn new(metal_count: usize, zone_sizes: &[usize]) -> Self {
        Self {
            metal_count,
            zone_sizes: zone_sizes.to_vec(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.metals.len(), &config.zones.sizes())
    }

    pub fn n_columns(&self) -> usize {
        match self.zone_sizes.split_first() {
            Some((&ensemble, rest)) => {
                multiset_count(self.metal_count, ensemble) + rest.len() * self.metal_count
            }
            None => 0,
        }
    }

    /// Column range of every zone; the ensemble block comes first.
    fn groups(&self) -> Vec<Range<usize>> {
        let mut groups = Vec::with_capacity(self.zone_sizes.len());
        let Some((&ensemble, rest)) = self.zone_sizes.split_first() else {
            return groups;
        };
        let mut end = multiset_count(self.metal_count, ensemble);
        groups.push(0..end);
        for _ in rest {
            groups.push(end..end + self.metal_count);
            end += self.metal_count;
        }
        groups
    }

    #[instrument(skip_all, name = "regression_fit")]
    pub fn fit(&self, x: &[Vec<u32>], y: &[f64]) -> Result<WeightVector, RegressionError> {
        if self.zone_sizes.is_empty() {
            return Err(RegressionError::InvalidLayout("no zones"));
        }
        if self.metal_count == 0 {
            return Err(RegressionError::InvalidLayout("no metals"));
        }
        if x.is_empty() {
            return Err(RegressionError::EmptyDataset);
        }
        if y.len() != x.len() {
            return Err(RegressionError::DimensionMismatch {
                expected: x.len(),
                found: y.len(),
            });
        }
        let n_columns = self.n_columns();
        if let Some(row) = x.iter().find(|row| row.len() != n_columns) {
            return Err(RegressionError::DimensionMismatch {
                expected: n_columns,
                found: row.len(),
            });
        }

        let (retained, dropped): (Vec<usize>, Vec<usize>) =
            (0..n_columns).partition(|&column| x.iter().any(|row| row[column] != 0));
        if !dropped.is_empty() {
            info!(
                count = dropped.len(),
                columns = ?dropped,
                "Dropping fingerprint columns that are zero in every sample."
            );
        }

        let groups = self.groups();
        let pinned = reference_columns(x, &retained, &groups[1..]);
        let free: Vec<usize> = retained
            .iter()
            .copied()
            .filter(|column| !pinned.contains(column))
            .collect();
        debug!(?pinned, free = free.len(), "Selected free columns for the solve.");

        let a = DMatrix::from_fn(x.len(), free.len(), |i, j| f64::from(x[i][free[j]]));
        let b = DVector::from_column_slice(y);

        let rank = numerical_rank(&a);
        let singular = RegressionError::SingularMatrix {
            rank,
            columns: free.len(),
        };
        if rank < free.len() {
            return Err(singular);
        }
        let normal = a.transpose() * &a;
        let rhs = a.transpose() * &b;
        let solution = normal.cholesky().ok_or(singular)?.solve(&rhs);

        let mut coefficients = vec![0.0; retained.len()];
        for (j, column) in free.iter().enumerate() {
            if let Ok(position) = retained.binary_search(column) {
                coefficients[position] = solution[j];
            }
        }

        let group_means = self.fix_gauge(&retained, &mut coefficients, &groups);
        info!(
            samples = x.len(),
            retained = retained.len(),
            "Fitted symmetric least-squares model."
        );

        Ok(WeightVector {
            coefficients,
            retained,
            dropped,
            n_columns,
            group_means,
        })
    }

    /// Shifts every count zone to zero mean and moves the offset into the ensemble.
    fn fix_gauge(
        &self,
        retained: &[usize],
        coefficients: &mut [f64],
        groups: &[Range<usize>],
    ) -> Vec<f64> {
        let members = |group: &Range<usize>| -> Vec<usize> {
            (0..retained.len())
                .filter(|&position| group.contains(&retained[position]))
                .collect()
        };

        let mut means = Vec::with_capacity(groups.len().saturating_sub(1));
        let mut ensemble_shift = 0.0;
        for (group, &size) in groups[1..].iter().zip(&self.zone_sizes[1..]) {
            let positions = members(group);
            let mean = if positions.is_empty() {
                0.0
            } else {
                positions.iter().map(|&p| coefficients[p]).sum::<f64>() / positions.len() as f64
            };
            for &p in &positions {
                coefficients[p] -= mean;
            }
            ensemble_shift += size as f64 * mean;
            means.push(mean);
        }

        for p in members(&groups[0]) {
            coefficients[p] += ensemble_shift;
        }
        means
    }
}

/// Last retained column of every group whose retained columns sum to the same
/// value in every row.
fn reference_columns(x: &[Vec<u32>], retained: &[usize], groups: &[Range<usize>]) -> Vec<usize> {
    groups
        .iter()
        .filter_map(|group| {
            let columns: Vec<usize> = retained
                .iter()
                .copied()
                .filter(|column| group.contains(column))
                .collect();
            let last = *columns.last()?;
            let total = |row: &Vec<u32>| columns.iter().map(|&c| row[c]).sum::<u32>();
            let first = total(&x[0]);
            x.iter().all(|row| total(row) == first).then_some(last)
        })
        .collect()
}

fn numerical_rank(a: &DMatrix<f64>) -> usize {
    if a.is_empty() {
        return 0;
    }
    let singular_values = a.clone().svd(false, false).singular_values;
    let max = singular_values.iter().fold(0.0f64, |acc, &s| acc.max(s));
    let tolerance = RANK_TOLERANCE * max;
    singular_values.iter().filter(|&&s| s > tolerance).count()
}

/// Root-mean-square and mean absolute deviation of predictions from targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorMetrics {
    pub rmsd: f64,
    pub mae: f64,
    pub samples: usize,
}

impl ErrorMetrics {
    pub fn compute(predictions: &[f64], targets: &[f64]) -> Result<Self, RegressionError> {
        if predictions.len() != targets.len() {
            return Err(RegressionError::DimensionMismatch {
                expected: targets.len(),
                found: predictions.len(),
            });
        }
        if targets.is_empty() {
            return Err(RegressionError::EmptyDataset);
        }
        let n = targets.len() as f64;
        let (squared, absolute) = predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| p - t)
            .fold((0.0, 0.0), |(sq, abs), d| (sq + d * d, abs + d.abs()));
        Ok(Self {
            rmsd: (squared / n).sqrt(),
            mae: absolute / n,
            samples: targets.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    /// Two metals, on-top ensemble plus one two-atom count zone; all six sites.
    fn two_metal_rows() -> Vec<Vec<u32>> {
        let mut rows = Vec::new();
        for ensemble in [[1, 0], [0, 1]] {
            for counts in [[2, 0], [1, 1], [0, 2]] {
                rows.push(vec![ensemble[0], ensemble[1], counts[0], counts[1]]);
            }
        }
        rows
    }

    fn linear_targets(rows: &[Vec<u32>], weights: &[f64]) -> Vec<f64> {
        rows.iter()
            .map(|row| row.iter().zip(weights).map(|(&x, w)| f64::from(x) * w).sum())
            .collect()
    }

    fn rss(weights: &WeightVector, rows: &[Vec<u32>], y: &[f64]) -> f64 {
        weights
            .predict(rows)
            .unwrap()
            .iter()
            .zip(y)
            .map(|(p, t)| (p - t).powi(2))
            .sum()
    }

    #[test]
    fn ensemble_only_fit_recovers_per_metal_energies() {
        let model = SymmetricLeastSquares::new(2, &[1]);
        let weights = model.fit(&[vec![1, 0], vec![0, 1]], &[1.1, 2.0]).unwrap();
        assert!(f64_approx_equal(weights.coefficients()[0], 1.1));
        assert!(f64_approx_equal(weights.coefficients()[1], 2.0));
        assert!(weights.dropped().is_empty());
        assert!(weights.group_means().is_empty());
    }

    #[test]
    fn fit_reproduces_exact_linear_targets() {
        let rows = two_metal_rows();
        let y = linear_targets(&rows, &[0.5, 1.0, 0.2, -0.1]);
        let weights = SymmetricLeastSquares::new(2, &[1, 2]).fit(&rows, &y).unwrap();

        for (prediction, target) in weights.predict(&rows).unwrap().iter().zip(&y) {
            assert!(f64_approx_equal(*prediction, *target));
        }
    }

    #[test]
    fn gauge_fixing_centres_count_zones_and_shifts_ensemble() {
        let rows = two_metal_rows();
        let y = linear_targets(&rows, &[0.5, 1.0, 0.2, -0.1]);
        let weights = SymmetricLeastSquares::new(2, &[1, 2]).fit(&rows, &y).unwrap();

        let c = weights.coefficients();
        assert!(f64_approx_equal(c[2] + c[3], 0.0));
        assert!(f64_approx_equal(c[0], 0.6));
        assert!(f64_approx_equal(c[1], 1.1));
        assert!(f64_approx_equal(c[2], 0.15));
        assert!(f64_approx_equal(c[3], -0.15));
        assert_eq!(weights.group_means().len(), 1);
    }

    #[test]
    fn all_zero_columns_are_dropped_and_weigh_nothing() {
        let rows: Vec<Vec<u32>> = two_metal_rows()
            .into_iter()
            .map(|r| vec![r[0], r[1], 0, r[2], r[3], 0])
            .collect();
        let y = linear_targets(&rows, &[0.5, 1.0, 0.0, 0.2, -0.1, 0.0]);
        let weights = SymmetricLeastSquares::new(3, &[1, 2]).fit(&rows, &y).unwrap();

        assert_eq!(weights.dropped(), &[2, 5]);
        assert_eq!(weights.retained(), &[0, 1, 3, 4]);
        assert_eq!(weights.weight(2), Some(0.0));
        assert_eq!(weights.weight(6), None);
        let sum: f64 = weights.retained().iter().zip(weights.coefficients())
            .filter(|(column, _)| (3..6).contains(*column))
            .map(|(_, w)| w)
            .sum();
        assert!(f64_approx_equal(sum, 0.0));
    }

    #[test]
    fn residual_sum_of_squares_does_not_grow_with_more_zones() {
        let rows = two_metal_rows();
        let noise = [0.03, -0.02, 0.01, -0.04, 0.02, 0.05];
        let y: Vec<f64> = linear_targets(&rows, &[0.5, 1.0, 0.2, -0.1])
            .iter()
            .zip(noise)
            .map(|(t, n)| t + n)
            .collect();

        let ensemble_rows: Vec<Vec<u32>> = rows.iter().map(|r| r[..2].to_vec()).collect();
        let small = SymmetricLeastSquares::new(2, &[1]).fit(&ensemble_rows, &y).unwrap();
        let large = SymmetricLeastSquares::new(2, &[1, 2]).fit(&rows, &y).unwrap();

        assert!(rss(&large, &rows, &y) <= rss(&small, &ensemble_rows, &y) + TOLERANCE);
    }

    #[test]
    fn underdetermined_fit_is_singular() {
        let model = SymmetricLeastSquares::new(2, &[1, 2]);
        let result = model.fit(&[vec![1, 0, 1, 1]], &[0.3]);
        assert!(matches!(
            result,
            Err(RegressionError::SingularMatrix { rank: 1, columns: 2 })
        ));
    }

    #[test]
    fn shape_errors_are_reported() {
        let model = SymmetricLeastSquares::new(2, &[1]);
        assert_eq!(model.fit(&[], &[]), Err(RegressionError::EmptyDataset));
        assert_eq!(
            model.fit(&[vec![1, 0]], &[1.0, 2.0]),
            Err(RegressionError::DimensionMismatch {
                expected: 1,
                found: 2
            })
        );
        assert_eq!(
            model.fit(&[vec![1, 0, 0]], &[1.0]),
            Err(RegressionError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn predict_one_checks_row_length() {
        let weights = SymmetricLeastSquares::new(2, &[1])
            .fit(&[vec![1, 0], vec![0, 1]], &[1.1, 2.0])
            .unwrap();
        assert!(f64_approx_equal(weights.predict_one(&[0, 1]).unwrap(), 2.0));
        assert_eq!(
            weights.predict_one(&[0, 1, 0]),
            Err(RegressionError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn weights_survive_a_toml_round_trip() {
        let rows = two_metal_rows();
        let y = linear_targets(&rows, &[0.5, 1.0, 0.2, -0.1]);
        let weights = SymmetricLeastSquares::new(2, &[1, 2]).fit(&rows, &y).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("weights.toml");
        weights.save(&path).unwrap();
        assert_eq!(WeightVector::load(&path).unwrap(), weights);
    }

    #[test]
    fn inconsistent_weight_files_are_rejected() {
        let content = "n-columns = 3\nretained = [0, 1]\ndropped = []\ncoefficients = [1.0, 2.0]\ngroup-means = []\n";
        assert!(toml::from_str::<WeightVector>(content).is_err());
    }

    #[test]
    fn error_metrics_match_hand_computation() {
        let metrics = ErrorMetrics::compute(&[1.0, 2.0, 4.0], &[1.0, 1.0, 1.0]).unwrap();
        assert!(f64_approx_equal(metrics.mae, 4.0 / 3.0));
        assert!(f64_approx_equal(metrics.rmsd, (10.0f64 / 3.0).sqrt()));
        assert_eq!(metrics.samples, 3);
        assert!(ErrorMetrics::compute(&[], &[]).is_err());
    }
}
