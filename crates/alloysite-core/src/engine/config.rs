use crate::core::geometry::zones::{SiteGeometry, ZoneKind, shell_plan};
use crate::core::utils::combinatorics::multiset_count;
use crate::engine::energetics::{Adsorbate, ReferenceEnergies};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Default z-expansion tolerated before a slab counts as distorted.
pub const DEFAULT_DISTORTION_THRESHOLD: f64 = 1.10;
/// Default in-plane distance below which an adsorbate counts as on-top.
pub const DEFAULT_ON_TOP_DISTANCE: f64 = 0.70;
/// Default number of rows above which enumeration output is split per ensemble.
pub const DEFAULT_CHUNK_THRESHOLD: u64 = 1_000_000;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Zone schedule is empty")]
    EmptySchedule,

    #[error("The first zone must be the ensemble zone, found {0}")]
    EnsembleNotFirst(ZoneKind),

    #[error("Zone {position} repeats the ensemble zone")]
    DuplicateEnsemble { position: usize },

    #[error("Zone {position} ({kind}) has size 0")]
    EmptyZone { position: usize, kind: ZoneKind },

    #[error("Metal set is empty")]
    EmptyMetalSet,

    #[error("Metal '{0}' appears more than once")]
    DuplicateMetal(String),

    #[error("{geometry:?} adsorption needs a {expected}-atom ensemble, schedule defines {found}")]
    EnsembleSizeMismatch {
        geometry: SiteGeometry,
        expected: usize,
        found: usize,
    },

    #[error("Zone {zone} is not defined for {geometry:?} adsorption")]
    UnsupportedZone {
        zone: ZoneKind,
        geometry: SiteGeometry,
    },
}

/// One entry of a zone schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Zone {
    pub kind: ZoneKind,
    /// Number of atoms in the zone.
    pub size: usize,
}

impl Zone {
    pub const fn new(kind: ZoneKind, size: usize) -> Self {
        Self { kind, size }
    }
}

/// Ordered list of fingerprint zones. The first zone is always the ensemble zone
/// and no other zone is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Zone>", into = "Vec<Zone>")]
pub struct ZoneSchedule {
    zones: Vec<Zone>,
}

impl ZoneSchedule {
    pub fn new(zones: Vec<Zone>) -> Result<Self, ConfigError> {
        let first = zones.first().ok_or(ConfigError::EmptySchedule)?;
        if !first.kind.is_ensemble() {
            return Err(ConfigError::EnsembleNotFirst(first.kind));
        }
        for (position, zone) in zones.iter().enumerate() {
            if position > 0 && zone.kind.is_ensemble() {
                return Err(ConfigError::DuplicateEnsemble { position });
            }
            if zone.size == 0 {
                return Err(ConfigError::EmptyZone {
                    position,
                    kind: zone.kind,
                });
            }
        }
        Ok(Self { zones })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn ensemble(&self) -> &Zone {
        &self.zones[0]
    }

    /// All zones after the ensemble zone.
    pub fn count_zones(&self) -> &[Zone] {
        &self.zones[1..]
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.zones.iter().map(|zone| zone.size).collect()
    }

    /// Length of a fingerprint over `n_metals` metals:
    /// `C(k0 + m - 1, k0) + (zones - 1) * m`.
    pub fn fingerprint_len(&self, n_metals: usize) -> usize {
        multiset_count(n_metals, self.ensemble().size) + self.count_zones().len() * n_metals
    }
}

impl TryFrom<Vec<Zone>> for ZoneSchedule {
    type Error = ConfigError;

    fn try_from(zones: Vec<Zone>) -> Result<Self, Self::Error> {
        ZoneSchedule::new(zones)
    }
}

impl From<ZoneSchedule> for Vec<Zone> {
    fn from(schedule: ZoneSchedule) -> Self {
        schedule.zones
    }
}

/// Ordered, duplicate-free metal vocabulary. A metal's position fixes its column
/// in every count zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct MetalSet {
    metals: Vec<String>,
}

impl MetalSet {
    pub fn new<S: Into<String>>(metals: impl IntoIterator<Item = S>) -> Result<Self, ConfigError> {
        let metals: Vec<String> = metals.into_iter().map(Into::into).collect();
        if metals.is_empty() {
            return Err(ConfigError::EmptyMetalSet);
        }
        let mut seen = HashSet::new();
        for metal in &metals {
            if !seen.insert(metal.as_str()) {
                return Err(ConfigError::DuplicateMetal(metal.clone()));
            }
        }
        Ok(Self { metals })
    }

    pub fn len(&self) -> usize {
        self.metals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metals.is_empty()
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.metals.iter().position(|metal| metal == symbol)
    }

    pub fn symbol(&self, index: usize) -> Option<&str> {
        self.metals.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.metals
    }

    /// Concatenated symbols of a multiset of metal indices, e.g. `"PtPtRu"`.
    pub fn label(&self, multiset: &[usize]) -> String {
        multiset
            .iter()
            .filter_map(|&index| self.symbol(index))
            .collect()
    }
}

impl TryFrom<Vec<String>> for MetalSet {
    type Error = ConfigError;

    fn try_from(metals: Vec<String>) -> Result<Self, Self::Error> {
        MetalSet::new(metals)
    }
}

impl From<MetalSet> for Vec<String> {
    fn from(set: MetalSet) -> Self {
        set.metals
    }
}

/// Everything that defines the fingerprint of one adsorption model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub geometry: SiteGeometry,
    pub metals: MetalSet,
    pub zones: ZoneSchedule,
}

impl ModelConfig {
    pub fn fingerprint_len(&self) -> usize {
        self.zones.fingerprint_len(self.metals.len())
    }
}

#[derive(Default)]
pub struct ModelConfigBuilder {
    geometry: Option<SiteGeometry>,
    metals: Option<Vec<String>>,
    zones: Option<Vec<Zone>>,
}

impl ModelConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geometry(mut self, geometry: SiteGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }
    pub fn metals<S: Into<String>>(mut self, metals: impl IntoIterator<Item = S>) -> Self {
        self.metals = Some(metals.into_iter().map(Into::into).collect());
        self
    }
    pub fn zones(mut self, zones: Vec<Zone>) -> Self {
        self.zones = Some(zones);
        self
    }

    /// Validates the schedule against the adsorption geometry: the ensemble must
    /// have the geometry's size and every zone must be defined for it.
    pub fn build(self) -> Result<ModelConfig, ConfigError> {
        let geometry = self
            .geometry
            .ok_or(ConfigError::MissingParameter("geometry"))?;
        let metals = MetalSet::new(self.metals.ok_or(ConfigError::MissingParameter("metals"))?)?;
        let zones = ZoneSchedule::new(self.zones.ok_or(ConfigError::MissingParameter("zones"))?)?;

        let expected = geometry.ensemble_size();
        if zones.ensemble().size != expected {
            return Err(ConfigError::EnsembleSizeMismatch {
                geometry,
                expected,
                found: zones.ensemble().size,
            });
        }
        for zone in zones.count_zones() {
            // Site classification only changes shell sizes, never availability.
            if shell_plan(zone.kind, geometry, None).is_err() {
                return Err(ConfigError::UnsupportedZone {
                    zone: zone.kind,
                    geometry,
                });
            }
        }

        Ok(ModelConfig {
            geometry,
            metals,
            zones,
        })
    }
}

/// Hollow-site type a featurization run may be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HollowSite {
    Fcc,
    Hcp,
}

/// Sample filters and energy references used when turning relaxed structures into
/// a training dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturizationConfig {
    pub adsorbate: Adsorbate,
    pub references: ReferenceEnergies,
    pub distortion_threshold: f64,
    /// Reject samples whose adsorbate drifted away from an on-top position.
    pub on_top_distance: Option<f64>,
    /// Reject hollow-site samples of the other site type.
    pub required_site: Option<HollowSite>,
}

#[derive(Default)]
pub struct FeaturizationConfigBuilder {
    adsorbate: Option<Adsorbate>,
    references: Option<ReferenceEnergies>,
    distortion_threshold: Option<f64>,
    on_top_distance: Option<f64>,
    required_site: Option<HollowSite>,
}

impl FeaturizationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adsorbate(mut self, adsorbate: Adsorbate) -> Self {
        self.adsorbate = Some(adsorbate);
        self
    }
    pub fn references(mut self, references: ReferenceEnergies) -> Self {
        self.references = Some(references);
        self
    }
    pub fn distortion_threshold(mut self, threshold: f64) -> Self {
        self.distortion_threshold = Some(threshold);
        self
    }
    pub fn on_top_distance(mut self, distance: f64) -> Self {
        self.on_top_distance = Some(distance);
        self
    }
    pub fn required_site(mut self, site: HollowSite) -> Self {
        self.required_site = Some(site);
        self
    }

    /// Only the adsorbate is required; references and the distortion threshold
    /// fall back to their defaults and the site filters stay disabled.
    pub fn build(self) -> Result<FeaturizationConfig, ConfigError> {
        Ok(FeaturizationConfig {
            adsorbate: self
                .adsorbate
                .ok_or(ConfigError::MissingParameter("adsorbate"))?,
            references: self.references.unwrap_or_default(),
            distortion_threshold: self
                .distortion_threshold
                .unwrap_or(DEFAULT_DISTORTION_THRESHOLD),
            on_top_distance: self.on_top_distance,
            required_site: self.required_site,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationConfig {
    /// Spaces with more rows than this are written as one file per ensemble.
    pub chunk_threshold: u64,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
        }
    }
}
