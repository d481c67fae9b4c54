use crate::core::geometry::zones::SiteGeometry;
use serde::{Deserialize, Serialize};

/// Adsorbed intermediate of the oxygen reduction reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adsorbate {
    /// Atomic oxygen, binding in three-fold hollow sites.
    O,
    /// Hydroxyl, binding on top of a single surface atom.
    Oh,
}

impl Adsorbate {
    pub fn site_geometry(self) -> SiteGeometry {
        match self {
            Adsorbate::O => SiteGeometry::Hollow,
            Adsorbate::Oh => SiteGeometry::OnTop,
        }
    }
}

/// Total energies (eV) of the gas-phase references.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ReferenceEnergies {
    pub water: f64,
    pub hydrogen: f64,
}

impl Default for ReferenceEnergies {
    fn default() -> Self {
        Self {
            water: -12.261853,
            hydrogen: -6.673272,
        }
    }
}

/// Adsorption energy relative to water and hydrogen:
///
/// - `*OH`: `E(slab+OH) + ½·E(H₂) − E(slab) − E(H₂O)`
/// - `*O`:  `E(slab+O) + E(H₂) − E(slab) − E(H₂O)`
pub fn adsorption_energy(
    adsorbate: Adsorbate,
    adsorbed_energy: f64,
    clean_energy: f64,
    references: &ReferenceEnergies,
) -> f64 {
    let released_hydrogen = match adsorbate {
        Adsorbate::O => 1.0,
        Adsorbate::Oh => 0.5,
    };
    adsorbed_energy + released_hydrogen * references.hydrogen - clean_energy - references.water
}
