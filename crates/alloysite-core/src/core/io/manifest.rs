use super::error::IoError;
use crate::core::geometry::error::GeometryError;
use crate::core::models::atom::{Atom, LayerTag};
use crate::core::models::structure::AtomicStructure;
use nalgebra::{Matrix3, Point3};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AtomRecord {
    pub symbol: String,
    pub position: [f64; 3],
    pub tag: i64,
}

/// One relaxed calculation: a slab with its adsorbate, the total energy of that
/// structure and the total energy of the same slab without adsorbate.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SampleRecord {
    pub id: String,
    pub energy: f64,
    pub clean_energy: f64,
    /// Lattice vectors, one per row.
    pub cell: [[f64; 3]; 3],
    pub atoms: Vec<AtomRecord>,
}

impl SampleRecord {
    /// Builds the atomic structure, validating every layer tag.
    pub fn to_structure(&self) -> Result<AtomicStructure, GeometryError> {
        let atoms = self
            .atoms
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let tag = u8::try_from(record.tag)
                    .ok()
                    .and_then(|t| LayerTag::try_from(t).ok())
                    .ok_or(GeometryError::MalformedTag {
                        atom: index,
                        tag: record.tag,
                    })?;
                let [x, y, z] = record.position;
                Ok(Atom::new(&record.symbol, Point3::new(x, y, z), tag))
            })
            .collect::<Result<Vec<_>, GeometryError>>()?;

        let [a, b, c] = self.cell;
        let cell = Matrix3::new(a[0], a[1], a[2], b[0], b[1], b[2], c[0], c[1], c[2]);
        Ok(AtomicStructure::new(atoms, cell))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default)]
    sample: Vec<SampleRecord>,
}

/// Loads all `[[sample]]` tables of a TOML sample manifest.
pub fn load_manifest(path: &Path) -> Result<Vec<SampleRecord>, IoError> {
    let content = std::fs::read_to_string(path).map_err(|e| IoError::io(path, e))?;
    parse_manifest(&content).map_err(|e| IoError::Toml {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn parse_manifest(content: &str) -> Result<Vec<SampleRecord>, toml::de::Error> {
    let file: ManifestFile = toml::from_str(content)?;
    Ok(file.sample)
}
