use crate::core::io::error::IoError;
use crate::core::io::table::{EnumerationTableReader, shard_path};
use crate::core::utils::combinatorics::multisets;
use crate::engine::config::{EnumerationConfig, ModelConfig};
use crate::engine::enumeration::{EmissionSummary, SpaceEnumerator, decode_ensemble_index};
use crate::engine::error::EngineError;
use crate::engine::histogram::{BinSpec, Histogram};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::regression::WeightVector;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Predicts every fingerprint of the model's space and writes the enumeration table.
#[instrument(skip_all, name = "enumerate_workflow")]
pub fn run(
    model: &ModelConfig,
    weights: &WeightVector,
    output: &Path,
    config: &EnumerationConfig,
    reporter: &ProgressReporter,
) -> Result<EmissionSummary, EngineError> {
    let enumerator = SpaceEnumerator::from_config(model, weights)?;
    let summary = reporter.phase("Enumeration", || enumerator.write(output, config, reporter))?;
    info!(
        rows = %summary.rows,
        files = summary.files.len(),
        "Enumeration complete."
    );
    Ok(summary)
}

/// Label of every ensemble multiset, e.g. `"PtPtRu"`, in enumeration order.
pub fn ensemble_labels(model: &ModelConfig) -> Vec<String> {
    multisets(model.metals.len(), model.zones.ensemble().size)
        .iter()
        .map(|set| model.metals.label(set))
        .collect()
}

/// Where an enumeration table lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLayout {
    Single(PathBuf),
    /// One file per ensemble, indexed by ensemble id.
    Sharded(Vec<PathBuf>),
}

/// Finds the table written for `path`: the file itself, or else a complete set of
/// per-ensemble shards.
pub fn locate_tables(model: &ModelConfig, path: &Path) -> Result<TableLayout, EngineError> {
    if path.is_file() {
        return Ok(TableLayout::Single(path.to_path_buf()));
    }
    let ensembles = ensemble_labels(model).len();
    let shards: Vec<PathBuf> = (0..ensembles).map(|id| shard_path(path, id)).collect();
    if let Some(missing) = shards.iter().find(|shard| !shard.is_file()) {
        return Err(IoError::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "no enumeration table, and shard '{}' is missing",
                    missing.display()
                ),
            ),
        )
        .into());
    }
    Ok(TableLayout::Sharded(shards))
}

/// Builds multiplicity-weighted energy histograms from an enumeration table.
///
/// Rows of a single table are attributed to ensembles by decoding their row index;
/// rows of a shard belong to the shard's ensemble.
#[instrument(skip_all, name = "histogram_workflow")]
pub fn aggregate_histogram(
    model: &ModelConfig,
    path: &Path,
    bins: &BinSpec,
    reporter: &ProgressReporter,
) -> Result<Histogram, EngineError> {
    let labels = ensemble_labels(model);
    let mut histogram = Histogram::new(bins, labels)?;
    let n_metals = model.metals.len();
    let zone_sizes = model.zones.sizes();

    reporter.report(Progress::PhaseStart {
        name: "Histogram",
    });
    let mut skipped = 0u64;
    match locate_tables(model, path)? {
        TableLayout::Single(table) => {
            reporter.report(Progress::TaskStart { total_steps: 1 });
            let mut reader = EnumerationTableReader::open(&table, n_metals)?;
            for (row, record) in reader.records().enumerate() {
                let record = record?;
                let ensemble = decode_ensemble_index(row as u128, &zone_sizes, n_metals)?;
                if !histogram.add(ensemble, record.energy, record.multiplicity)? {
                    skipped += 1;
                }
            }
            reporter.report(Progress::TaskIncrement);
        }
        TableLayout::Sharded(shards) => {
            reporter.report(Progress::TaskStart {
                total_steps: shards.len() as u64,
            });
            for (ensemble, shard) in shards.iter().enumerate() {
                let mut reader = EnumerationTableReader::open(shard, n_metals)?;
                for record in reader.records() {
                    let record = record?;
                    if !histogram.add(ensemble, record.energy, record.multiplicity)? {
                        skipped += 1;
                    }
                }
                reporter.report(Progress::TaskIncrement);
            }
        }
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    info!(
        weight = histogram.total().iter().sum::<u64>(),
        skipped_rows = skipped,
        "Histogram aggregated."
    );
    Ok(histogram)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::zones::{SiteGeometry, ZoneKind};
    use crate::engine::config::{ModelConfigBuilder, Zone};
    use crate::engine::regression::SymmetricLeastSquares;
    use tempfile::tempdir;

    fn model() -> ModelConfig {
        ModelConfigBuilder::new()
            .geometry(SiteGeometry::OnTop)
            .metals(["A", "B"])
            .zones(vec![
                Zone::new(ZoneKind::Ensemble, 1),
                Zone::new(ZoneKind::Surface, 2),
            ])
            .build()
            .unwrap()
    }

    fn weights() -> WeightVector {
        // E = 1.0 (A) or 2.0 (B) on the ensemble, +0.1 per A neighbor.
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for (ensemble, base) in [([1, 0], 1.0), ([0, 1], 2.0)] {
            for (a, b) in [(2, 0), (1, 1), (0, 2)] {
                rows.push(vec![ensemble[0], ensemble[1], a, b]);
                y.push(base + 0.1 * f64::from(a));
            }
        }
        SymmetricLeastSquares::from_config(&model()).fit(&rows, &y).unwrap()
    }

    fn bins() -> BinSpec {
        BinSpec {
            start: 0.9,
            stop: 2.5,
            width: 0.5,
        }
    }

    #[test]
    fn labels_follow_multiset_order() {
        assert_eq!(ensemble_labels(&model()), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn single_table_histogram_decodes_ensembles_from_row_index() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("space.csv");
        let weights = weights();
        let summary = run(
            &model(),
            &weights,
            &output,
            &EnumerationConfig::default(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!(!summary.chunked);

        let histogram =
            aggregate_histogram(&model(), &output, &bins(), &ProgressReporter::new()).unwrap();
        // Edges 0.9, 1.4, 1.9, 2.4; ensemble A energies 1.0..1.2, B energies 2.0..2.2.
        assert_eq!(histogram.ensemble(0), Some(&[4, 0, 0][..]));
        assert_eq!(histogram.ensemble(1), Some(&[0, 0, 4][..]));
        assert_eq!(histogram.total(), &[4, 0, 4]);
    }

    #[test]
    fn sharded_tables_give_the_same_histogram() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("space.csv");
        let weights = weights();
        let summary = run(
            &model(),
            &weights,
            &output,
            &EnumerationConfig { chunk_threshold: 1 },
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!(summary.chunked);
        assert!(matches!(
            locate_tables(&model(), &output).unwrap(),
            TableLayout::Sharded(ref shards) if shards.len() == 2
        ));

        let histogram =
            aggregate_histogram(&model(), &output, &bins(), &ProgressReporter::new()).unwrap();
        assert_eq!(histogram.total(), &[4, 0, 4]);
        assert_eq!(histogram.ensemble(1), Some(&[0, 0, 4][..]));
    }

    #[test]
    fn missing_tables_are_reported() {
        let dir = tempdir().unwrap();
        let err = locate_tables(&model(), &dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
