use crate::core::io::error::IoError;
use crate::core::io::table::{EnumerationTableWriter, shard_path};
use crate::core::utils::combinatorics::{count_metals, multiplicity, multiset_count, multisets};
use crate::engine::config::{EnumerationConfig, ModelConfig};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::regression::WeightVector;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("Flat index {index} is outside the fingerprint space of {total} elements")]
    IndexOutOfRange { index: u128, total: u128 },

    #[error("Ensemble id {id} is outside the {count} ensemble multisets")]
    EnsembleOutOfRange { id: usize, count: usize },

    #[error("Weight vector has {found} columns but the zone layout defines {expected}")]
    WeightsMismatch { expected: usize, found: usize },

    #[error("Invalid zone layout: {0}")]
    InvalidLayout(&'static str),

    #[error("Failed to write enumeration table: {source}")]
    Table {
        #[from]
        source: IoError,
    },
}

/// One element of the fingerprint space.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumeratedFingerprint {
    /// Per-metal atom counts summed over all zones.
    pub metal_counts: Vec<u32>,
    pub energy: f64,
    /// Number of distinct atom arrangements that map onto this fingerprint.
    pub multiplicity: u64,
    /// Index of the ensemble multiset this element belongs to.
    pub ensemble_id: usize,
}

/// Multisets of one zone with their metal counts and multiplicities.
#[derive(Debug, Clone)]
struct ZoneTable {
    counts: Vec<Vec<u32>>,
    multiplicities: Vec<u64>,
}

impl ZoneTable {
    fn new(metal_count: usize, size: usize) -> Self {
        let counts: Vec<Vec<u32>> = multisets(metal_count, size)
            .iter()
            .map(|set| count_metals(set, metal_count))
            .collect();
        let multiplicities = counts.iter().map(|c| multiplicity(size, c)).collect();
        Self {
            counts,
            multiplicities,
        }
    }

    fn len(&self) -> usize {
        self.counts.len()
    }
}

fn radices(zone_sizes: &[usize], metal_count: usize) -> Vec<u128> {
    zone_sizes
        .iter()
        .map(|&size| multiset_count(metal_count, size) as u128)
        .collect()
}

fn space_size(radices: &[u128]) -> u128 {
    radices.iter().fold(1u128, |acc, &r| acc.saturating_mul(r))
}

/// Splits a flat enumeration index into one multiset id per zone.
///
/// The space is ordered ensemble-major with the innermost (last) zone varying
/// fastest, so the last zone is the least significant digit.
pub fn decode_zone_ids(
    flat_index: u128,
    zone_sizes: &[usize],
    metal_count: usize,
) -> Result<Vec<usize>, EnumerationError> {
    let radices = radices(zone_sizes, metal_count);
    let total = space_size(&radices);
    if flat_index >= total {
        return Err(EnumerationError::IndexOutOfRange {
            index: flat_index,
            total,
        });
    }

    let mut remainder = flat_index;
    let mut digits = vec![0usize; radices.len()];
    for (digit, &radix) in digits.iter_mut().zip(&radices).rev() {
        *digit = (remainder % radix) as usize;
        remainder /= radix;
    }
    Ok(digits)
}

/// Ensemble multiset id of the element at `flat_index`.
pub fn decode_ensemble_index(
    flat_index: u128,
    zone_sizes: &[usize],
    metal_count: usize,
) -> Result<usize, EnumerationError> {
    decode_zone_ids(flat_index, zone_sizes, metal_count)?
        .first()
        .copied()
        .ok_or(EnumerationError::InvalidLayout("no zones"))
}

/// Files and rows produced by [`SpaceEnumerator::write`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionSummary {
    pub files: Vec<PathBuf>,
    pub rows: u128,
    pub chunked: bool,
}

/// Walks the complete fingerprint space of a zone layout, predicting every
/// element with a fitted [`WeightVector`].
pub struct SpaceEnumerator<'w> {
    zone_sizes: Vec<usize>,
    metal_count: usize,
    zones: Vec<ZoneTable>,
    weights: &'w WeightVector,
}

impl<'w> SpaceEnumerator<'w> {
    pub fn new(
        zone_sizes: &[usize],
        metal_count: usize,
        weights: &'w WeightVector,
    ) -> Result<Self, EnumerationError> {
        if zone_sizes.is_empty() {
            return Err(EnumerationError::InvalidLayout("no zones"));
        }
        if metal_count == 0 {
            return Err(EnumerationError::InvalidLayout("no metals"));
        }
        if zone_sizes.contains(&0) {
            return Err(EnumerationError::InvalidLayout("empty zone"));
        }

        let zones: Vec<ZoneTable> = zone_sizes
            .iter()
            .map(|&size| ZoneTable::new(metal_count, size))
            .collect();
        let expected = zones[0].len() + (zones.len() - 1) * metal_count;
        if weights.n_columns() != expected {
            return Err(EnumerationError::WeightsMismatch {
                expected,
                found: weights.n_columns(),
            });
        }

        Ok(Self {
            zone_sizes: zone_sizes.to_vec(),
            metal_count,
            zones,
            weights,
        })
    }

    pub fn from_config(
        config: &ModelConfig,
        weights: &'w WeightVector,
    ) -> Result<Self, EnumerationError> {
        Self::new(&config.zones.sizes(), config.metals.len(), weights)
    }

    pub fn zone_sizes(&self) -> &[usize] {
        &self.zone_sizes
    }

    pub fn ensemble_count(&self) -> usize {
        self.zones[0].len()
    }

    /// Number of elements in the whole space.
    pub fn total_size(&self) -> u128 {
        space_size(&radices(&self.zone_sizes, self.metal_count))
    }

    /// Number of elements sharing one ensemble multiset.
    pub fn partition_size(&self) -> u128 {
        space_size(&radices(&self.zone_sizes[1..], self.metal_count))
    }

    /// Iterates over the whole space in flat-index order.
    pub fn iter(&self) -> SpaceIter<'_, 'w> {
        SpaceIter::new(self, 0..self.ensemble_count())
    }

    /// Iterates over the elements of a single ensemble multiset.
    pub fn partition(&self, ensemble_id: usize) -> Result<SpaceIter<'_, 'w>, EnumerationError> {
        if ensemble_id >= self.ensemble_count() {
            return Err(EnumerationError::EnsembleOutOfRange {
                id: ensemble_id,
                count: self.ensemble_count(),
            });
        }
        Ok(SpaceIter::new(self, ensemble_id..ensemble_id + 1))
    }

    /// Writes the space to `path`, or to one `<stem>_<id>.<ext>` shard per ensemble
    /// when it has more rows than the configured chunk threshold.
    #[instrument(skip_all, name = "enumeration_write")]
    pub fn write(
        &self,
        path: &Path,
        config: &EnumerationConfig,
        reporter: &ProgressReporter,
    ) -> Result<EmissionSummary, EnumerationError> {
        let rows = self.total_size();
        info!(
            rows = %rows,
            ensembles = self.ensemble_count(),
            "Enumerating fingerprint space."
        );

        if rows <= u128::from(config.chunk_threshold) {
            reporter.report(Progress::TaskStart { total_steps: 1 });
            write_rows(path, self.iter())?;
            reporter.report(Progress::TaskIncrement);
            reporter.report(Progress::TaskFinish);
            return Ok(EmissionSummary {
                files: vec![path.to_path_buf()],
                rows,
                chunked: false,
            });
        }

        info!(
            threshold = config.chunk_threshold,
            "Space exceeds chunk threshold; writing one shard per ensemble."
        );
        reporter.report(Progress::TaskStart {
            total_steps: self.ensemble_count() as u64,
        });

        let ids: Vec<usize> = (0..self.ensemble_count()).collect();

        #[cfg(not(feature = "parallel"))]
        let iterator = ids.iter();

        #[cfg(feature = "parallel")]
        let iterator = ids.par_iter();

        let files = iterator
            .map(|&id| -> Result<PathBuf, EnumerationError> {
                let shard = shard_path(path, id);
                write_rows(&shard, self.partition(id)?)?;
                reporter.report(Progress::TaskIncrement);
                Ok(shard)
            })
            .collect::<Result<Vec<_>, _>>()?;

        reporter.report(Progress::TaskFinish);
        info!(shards = files.len(), "Wrote enumeration shards.");
        Ok(EmissionSummary {
            files,
            rows,
            chunked: true,
        })
    }
}

fn write_rows(path: &Path, rows: SpaceIter<'_, '_>) -> Result<(), EnumerationError> {
    let mut writer = EnumerationTableWriter::create(path)?;
    for row in rows {
        writer.write(&row.metal_counts, row.energy, row.multiplicity)?;
    }
    writer.finish()?;
    Ok(())
}

/// Lazy odometer over the zone multisets. Restart by calling
/// [`SpaceEnumerator::iter`] or [`SpaceEnumerator::partition`] again.
pub struct SpaceIter<'a, 'w> {
    enumerator: &'a SpaceEnumerator<'w>,
    digits: Vec<usize>,
    ensemble_end: usize,
    fingerprint: Vec<u32>,
    done: bool,
}

impl<'a, 'w> SpaceIter<'a, 'w> {
    fn new(enumerator: &'a SpaceEnumerator<'w>, ensembles: std::ops::Range<usize>) -> Self {
        let mut digits = vec![0; enumerator.zones.len()];
        digits[0] = ensembles.start;
        Self {
            enumerator,
            digits,
            ensemble_end: ensembles.end,
            fingerprint: vec![0; enumerator.weights.n_columns()],
            done: ensembles.is_empty(),
        }
    }

    fn current(&mut self) -> EnumeratedFingerprint {
        let enumerator = self.enumerator;
        let zones = &enumerator.zones;
        let metal_count = enumerator.metal_count;
        let ensemble_columns = zones[0].len();

        self.fingerprint.fill(0);
        self.fingerprint[self.digits[0]] = 1;

        let mut metal_counts = vec![0u32; metal_count];
        let mut total_multiplicity = 1u64;
        for (position, (zone, &digit)) in zones.iter().zip(&self.digits).enumerate() {
            let counts = &zone.counts[digit];
            for (total, &count) in metal_counts.iter_mut().zip(counts) {
                *total += count;
            }
            total_multiplicity = total_multiplicity.saturating_mul(zone.multiplicities[digit]);
            if position > 0 {
                let offset = ensemble_columns + (position - 1) * metal_count;
                self.fingerprint[offset..offset + metal_count].copy_from_slice(counts);
            }
        }

        EnumeratedFingerprint {
            metal_counts,
            energy: enumerator.weights.dot(&self.fingerprint),
            multiplicity: total_multiplicity,
            ensemble_id: self.digits[0],
        }
    }

    fn advance(&mut self) {
        let zones = &self.enumerator.zones[..];
        for position in (1..self.digits.len()).rev() {
            self.digits[position] += 1;
            if self.digits[position] < zones[position].len() {
                return;
            }
            self.digits[position] = 0;
        }
        self.digits[0] += 1;
        if self.digits[0] >= self.ensemble_end {
            self.done = true;
        }
    }
}

impl Iterator for SpaceIter<'_, '_> {
    type Item = EnumeratedFingerprint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.current();
        self.advance();
        Some(item)
    }
}

impl<'a, 'w> IntoIterator for &'a SpaceEnumerator<'w> {
    type Item = EnumeratedFingerprint;
    type IntoIter = SpaceIter<'a, 'w>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The complete fingerprint space of `zone_sizes` over `metal_count` metals.
/// Iterate it with `for element in &space`; every pass starts from the beginning.
pub fn enumerate_all<'w>(
    zone_sizes: &[usize],
    metal_count: usize,
    weights: &'w WeightVector,
) -> Result<SpaceEnumerator<'w>, EnumerationError> {
    SpaceEnumerator::new(zone_sizes, metal_count, weights)
}
