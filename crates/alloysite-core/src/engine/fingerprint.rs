use crate::core::utils::combinatorics::{multiset_count, multisets};
use crate::engine::config::{MetalSet, ModelConfig, ZoneSchedule};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Expected symbol lists for {expected} zones, got {found}")]
    ZoneCountMismatch { expected: usize, found: usize },

    #[error("Ensemble {symbols:?} is not a {size}-atom multiset over the metal set")]
    UnknownEnsemble { symbols: Vec<String>, size: usize },

    #[error("Zone {zone} expects {expected} atoms, got {found}")]
    ZoneSizeMismatch {
        zone: usize,
        expected: usize,
        found: usize,
    },
}

/// Turns per-zone metal symbol lists into fingerprint vectors.
///
/// The fingerprint starts with a one-hot block over every multiset of the ensemble
/// zone (lexicographic over metal indices), followed by one block of per-metal atom
/// counts for each remaining zone.
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    schedule: ZoneSchedule,
    metals: MetalSet,
    ensembles: Vec<Vec<usize>>,
}

impl FingerprintBuilder {
    pub fn new(schedule: &ZoneSchedule, metals: &MetalSet) -> Self {
        Self {
            schedule: schedule.clone(),
            metals: metals.clone(),
            ensembles: multisets(metals.len(), schedule.ensemble().size),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(&config.zones, &config.metals)
    }

    pub fn len(&self) -> usize {
        self.ensembles.len() + self.schedule.count_zones().len() * self.metals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ensemble_count(&self) -> usize {
        self.ensembles.len()
    }

    /// Position of the observed ensemble among the sorted multisets.
    pub fn ensemble_index<S: AsRef<str>>(&self, symbols: &[S]) -> Result<usize, EncodingError> {
        let size = self.schedule.ensemble().size;
        let unknown = || EncodingError::UnknownEnsemble {
            symbols: symbols.iter().map(|s| s.as_ref().to_string()).collect(),
            size,
        };

        if symbols.len() != size {
            return Err(unknown());
        }
        let mut indices = symbols
            .iter()
            .map(|s| self.metals.index_of(s.as_ref()))
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(unknown)?;
        indices.sort_unstable();

        self.ensembles.binary_search(&indices).map_err(|_| unknown())
    }

    /// Encodes one site. `per_zone` holds the metal symbols of every zone in
    /// schedule order; symbols outside the metal set are ignored in count zones.
    pub fn build<S: AsRef<str>>(&self, per_zone: &[Vec<S>]) -> Result<Vec<u32>, EncodingError> {
        if per_zone.len() != self.schedule.len() {
            return Err(EncodingError::ZoneCountMismatch {
                expected: self.schedule.len(),
                found: per_zone.len(),
            });
        }

        let n_metals = self.metals.len();
        let mut fingerprint = vec![0u32; self.len()];
        fingerprint[self.ensemble_index(&per_zone[0])?] = 1;

        let zones = self.schedule.count_zones().iter().zip(&per_zone[1..]);
        for (position, (zone, symbols)) in zones.enumerate() {
            if symbols.len() != zone.size {
                return Err(EncodingError::ZoneSizeMismatch {
                    zone: position + 1,
                    expected: zone.size,
                    found: symbols.len(),
                });
            }
            let offset = self.ensembles.len() + position * n_metals;
            for symbol in symbols {
                if let Some(metal) = self.metals.index_of(symbol.as_ref()) {
                    fingerprint[offset + metal] += 1;
                }
            }
        }
        debug_assert_eq!(
            self.ensembles.len(),
            multiset_count(n_metals, self.schedule.ensemble().size)
        );
        Ok(fingerprint)
    }
}

/// One-shot form of [`FingerprintBuilder::build`].
pub fn build_fingerprint<S: AsRef<str>>(
    schedule: &ZoneSchedule,
    per_zone: &[Vec<S>],
    metals: &MetalSet,
) -> Result<Vec<u32>, EncodingError> {
    FingerprintBuilder::new(schedule, metals).build(per_zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::zones::ZoneKind;
    use crate::engine::config::Zone;

    fn metals() -> MetalSet {
        MetalSet::new(["Ir", "Pd", "Pt", "Rh", "Ru"]).unwrap()
    }

    fn hollow_schedule() -> ZoneSchedule {
        ZoneSchedule::new(vec![
            Zone::new(ZoneKind::Ensemble, 3),
            Zone::new(ZoneKind::SurfaceNear, 3),
        ])
        .unwrap()
    }

    #[test]
    fn ensemble_one_hot_position_ignores_symbol_order() {
        let builder = FingerprintBuilder::new(&hollow_schedule(), &metals());
        assert_eq!(builder.ensemble_count(), 35);
        assert_eq!(builder.ensemble_index(&["Ir", "Ir", "Ir"]), Ok(0));
        assert_eq!(builder.ensemble_index(&["Ir", "Ir", "Pd"]), Ok(1));
        assert_eq!(
            builder.ensemble_index(&["Pt", "Ir", "Ru"]),
            builder.ensemble_index(&["Ru", "Pt", "Ir"])
        );
        assert_eq!(builder.ensemble_index(&["Ru", "Ru", "Ru"]), Ok(34));
    }

    #[test]
    fn fingerprint_concatenates_one_hot_and_counts() {
        let schedule = ZoneSchedule::new(vec![
            Zone::new(ZoneKind::Ensemble, 1),
            Zone::new(ZoneKind::Surface, 6),
            Zone::new(ZoneKind::Subsurface, 3),
        ])
        .unwrap();
        let per_zone = vec![
            vec!["Pt"],
            vec!["Pt", "Pt", "Ru", "Ir", "Pt", "Ru"],
            vec!["Rh", "Rh", "Pd"],
        ];
        let fingerprint = build_fingerprint(&schedule, &per_zone, &metals()).unwrap();
        assert_eq!(
            fingerprint,
            vec![0, 0, 1, 0, 0, 1, 0, 3, 0, 2, 0, 1, 0, 2, 0]
        );
        assert_eq!(fingerprint[..5].iter().sum::<u32>(), 1);
    }

    #[test]
    fn unknown_symbols_are_ignored_in_count_zones() {
        let per_zone = vec![vec!["Pt", "Pt", "Pt"], vec!["Pt", "Au", "Ru"]];
        let fingerprint = build_fingerprint(&hollow_schedule(), &per_zone, &metals()).unwrap();
        assert_eq!(&fingerprint[35..], &[0, 0, 1, 0, 1]);
    }

    #[test]
    fn unknown_or_short_ensembles_are_rejected() {
        let builder = FingerprintBuilder::new(&hollow_schedule(), &metals());
        assert!(matches!(
            builder.build(&[vec!["Pt", "Au", "Pt"], vec!["Pt", "Pt", "Pt"]]),
            Err(EncodingError::UnknownEnsemble { size: 3, .. })
        ));
        assert!(matches!(
            builder.build(&[vec!["Pt", "Pt"], vec!["Pt", "Pt", "Pt"]]),
            Err(EncodingError::UnknownEnsemble { .. })
        ));
    }

    #[test]
    fn zone_count_and_zone_size_are_checked() {
        let builder = FingerprintBuilder::new(&hollow_schedule(), &metals());
        assert_eq!(
            builder.build(&[vec!["Pt", "Pt", "Pt"]]),
            Err(EncodingError::ZoneCountMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            builder.build(&[vec!["Pt", "Pt", "Pt"], vec!["Pt"]]),
            Err(EncodingError::ZoneSizeMismatch {
                zone: 1,
                expected: 3,
                found: 1
            })
        );
    }
}
