use super::error::GeometryError;
use super::triangle::Triangle;
use super::zones::{SiteGeometry, ZoneKind, shell_plan};
use crate::core::models::atom::LayerTag;
use crate::core::models::structure::AtomicStructure;
use nalgebra::Point2;
use std::cell::OnceCell;
use tracing::{debug, warn};

/// Number of periodic images along each in-plane lattice vector.
const TILING: usize = 3;

/// A metal atom selected from a neighbor shell of the tiled structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellAtom {
    pub symbol: String,
    /// Atom id in the tiled structure.
    pub id: usize,
}

/// Type of a three-fold hollow site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteClassification {
    /// No subsurface atom lies beneath the ensemble.
    Fcc,
    /// A subsurface atom lies beneath the ensemble and blocks the hollow.
    Hcp {
        blocking_symbol: String,
        blocking_atom: usize,
    },
}

/// Cached classification state of a [`Slab`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SiteState {
    #[default]
    Unclassified,
    Classified(SiteClassification),
}

/// Replicates `structure` 3×3×1 so that the central adsorbate sees complete
/// neighbor shells regardless of where it sits in the unit cell.
pub fn tile(structure: &AtomicStructure) -> AtomicStructure {
    structure.repeat(TILING, TILING, 1)
}

/// Returns the id of the adsorbing atom in the central replica of a 3×3×1 tiling.
///
/// The first adsorbate atom of each replica is taken as the binding atom (the O of
/// OH). Replicas form a 3×3 grid and the atom of grid cell (1, 1) is returned.
///
/// # Errors
///
/// Returns [`GeometryError::NoAdsorbate`] if no atom is tagged as adsorbate.
pub fn locate_adsorbate(tiled: &AtomicStructure) -> Result<usize, GeometryError> {
    let adsorbate_ids: Vec<usize> = tiled.ids_with_tag(LayerTag::Adsorbate).collect();
    let replicas = TILING * TILING;
    let per_replica = adsorbate_ids.len() / replicas;
    if per_replica == 0 {
        return Err(GeometryError::NoAdsorbate);
    }

    let binding_atoms: Vec<usize> = adsorbate_ids.into_iter().step_by(per_replica).collect();
    let centre = TILING / 2;
    Ok(binding_atoms[centre * TILING + centre])
}

/// Returns the atoms of `layer` ranked `start..=stop` (1-indexed) by distance from
/// `adsorbate`, ordered by atom id.
///
/// Atoms at exactly the same distance are ranked by ascending atom id.
///
/// # Errors
///
/// Returns [`GeometryError::ShellOutOfRange`] if the rank interval is empty or
/// extends beyond the number of atoms in the layer.
pub fn nearest_shell(
    tiled: &AtomicStructure,
    adsorbate: usize,
    layer: LayerTag,
    start: usize,
    stop: usize,
) -> Result<Vec<ShellAtom>, GeometryError> {
    let origin = tiled.atoms()[adsorbate].position;
    let mut ranked: Vec<(usize, f64)> = tiled
        .ids_with_tag(layer)
        .map(|id| (id, (tiled.atoms()[id].position - origin).norm()))
        .collect();

    if start == 0 || start > stop || stop > ranked.len() {
        return Err(GeometryError::ShellOutOfRange {
            layer,
            start,
            stop,
            available: ranked.len(),
        });
    }

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut shell: Vec<usize> = ranked[start - 1..stop].iter().map(|&(id, _)| id).collect();
    shell.sort_unstable();

    Ok(shell
        .into_iter()
        .map(|id| ShellAtom {
            symbol: tiled.atoms()[id].symbol.clone(),
            id,
        })
        .collect())
}

/// Classifies the hollow site formed by the three surface atoms closest to the
/// adsorbate.
///
/// The site is hcp when a subsurface atom projects strictly inside the ensemble
/// triangle, fcc otherwise. Subsurface atoms are scanned by ascending atom id and
/// the first interior one is reported; finding more than one is logged as a data
/// anomaly.
pub fn classify_site(
    tiled: &AtomicStructure,
    adsorbate: usize,
) -> Result<SiteClassification, GeometryError> {
    let ensemble = nearest_shell(tiled, adsorbate, LayerTag::Surface, 1, 3)?;
    let xy = |id: usize| {
        let p = tiled.atoms()[id].position;
        Point2::new(p.x, p.y)
    };
    let triangle = Triangle::new(xy(ensemble[0].id), xy(ensemble[1].id), xy(ensemble[2].id));

    let blocking: Vec<usize> = tiled
        .ids_with_tag(LayerTag::Subsurface)
        .filter(|&id| triangle.contains(&xy(id)))
        .collect();

    match blocking.as_slice() {
        [] => Ok(SiteClassification::Fcc),
        [first, rest @ ..] => {
            if !rest.is_empty() {
                warn!(
                    count = blocking.len(),
                    "Multiple subsurface atoms detected beneath the hollow site; using atom {}.",
                    first
                );
            }
            Ok(SiteClassification::Hcp {
                blocking_symbol: tiled.atoms()[*first].symbol.clone(),
                blocking_atom: *first,
            })
        }
    }
}

/// Maximum surface-to-bottom height allowed for an undistorted three-layer-spacing
/// slab whose bottom-layer nearest-neighbor distance is `bottom_spacing`.
pub(crate) fn slab_height_limit(bottom_spacing: f64, threshold: f64) -> f64 {
    let layer_spacing = bottom_spacing * 2f64.sqrt() / 3f64.sqrt();
    3.0 * layer_spacing * threshold
}

/// Returns `true` if the relaxed slab has expanded in z beyond `threshold` times its
/// ideal height (e.g. `1.10` allows a 10 % increase).
///
/// The ideal height is estimated from the distance between the first two bottom
/// layer atoms assuming close-packed (111) stacking. The comparison is strict: a
/// slab exactly at the limit is not distorted.
///
/// # Errors
///
/// Returns [`GeometryError::MissingLayer`] if the structure has fewer than two bottom
/// atoms or no surface atom.
pub fn is_distorted(structure: &AtomicStructure, threshold: f64) -> Result<bool, GeometryError> {
    let bottom: Vec<usize> = structure.ids_with_tag(LayerTag::Bottom).collect();
    if bottom.len() < 2 {
        return Err(GeometryError::MissingLayer {
            layer: LayerTag::Bottom,
            required: 2,
            found: bottom.len(),
        });
    }
    let surface: Vec<usize> = structure.ids_with_tag(LayerTag::Surface).collect();
    if surface.is_empty() {
        return Err(GeometryError::MissingLayer {
            layer: LayerTag::Surface,
            required: 1,
            found: 0,
        });
    }

    let atoms = structure.atoms();
    let spacing = (atoms[bottom[1]].position - atoms[bottom[0]].position).norm();
    let limit = slab_height_limit(spacing, threshold);

    let max_surface_z = surface
        .iter()
        .map(|&id| atoms[id].position.z)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_bottom_z = bottom
        .iter()
        .map(|&id| atoms[id].position.z)
        .fold(f64::INFINITY, f64::min);

    let height = max_surface_z - min_bottom_z;
    debug!(height, limit, "Checked slab height against distortion limit.");
    Ok(height > limit)
}

/// A relaxed slab with an adsorbate, answering site-geometry queries.
///
/// The 3×3×1 tiling is built on first use and kept for the lifetime of the slab;
/// the fcc/hcp classification is likewise computed once on demand.
#[derive(Debug)]
pub struct Slab {
    structure: AtomicStructure,
    tiled: OnceCell<AtomicStructure>,
    site: SiteState,
}

impl Slab {
    pub fn new(structure: AtomicStructure) -> Self {
        Self {
            structure,
            tiled: OnceCell::new(),
            site: SiteState::Unclassified,
        }
    }

    pub fn structure(&self) -> &AtomicStructure {
        &self.structure
    }

    pub fn tiled(&self) -> &AtomicStructure {
        self.tiled.get_or_init(|| tile(&self.structure))
    }

    pub fn site_state(&self) -> &SiteState {
        &self.site
    }

    /// Id of the central adsorbing atom in [`Slab::tiled`].
    pub fn adsorbate_id(&self) -> Result<usize, GeometryError> {
        locate_adsorbate(self.tiled())
    }

    /// See [`nearest_shell`].
    pub fn nearest_shell(
        &self,
        layer: LayerTag,
        start: usize,
        stop: usize,
    ) -> Result<Vec<ShellAtom>, GeometryError> {
        let adsorbate = self.adsorbate_id()?;
        nearest_shell(self.tiled(), adsorbate, layer, start, stop)
    }

    /// Returns the hollow-site classification, computing and caching it on first call.
    pub fn site(&mut self) -> Result<&SiteClassification, GeometryError> {
        if let SiteState::Unclassified = self.site {
            let adsorbate = self.adsorbate_id()?;
            let classification = classify_site(self.tiled(), adsorbate)?;
            debug!(?classification, "Classified hollow site.");
            self.site = SiteState::Classified(classification);
        }
        match &self.site {
            SiteState::Classified(classification) => Ok(classification),
            SiteState::Unclassified => unreachable!("site state was classified above"),
        }
    }

    /// See [`is_distorted`].
    pub fn is_distorted(&self, threshold: f64) -> Result<bool, GeometryError> {
        is_distorted(&self.structure, threshold)
    }

    /// Returns `true` if the in-plane distance between the adsorbate and its closest
    /// surface atom is below `max_xy_distance`.
    pub fn is_on_top(&self, max_xy_distance: f64) -> Result<bool, GeometryError> {
        let adsorbate = self.adsorbate_id()?;
        let closest = nearest_shell(self.tiled(), adsorbate, LayerTag::Surface, 1, 1)?;
        let atoms = self.tiled().atoms();
        let delta = atoms[closest[0].id].position - atoms[adsorbate].position;
        Ok(delta.x.hypot(delta.y) < max_xy_distance)
    }

    /// Metal symbols making up `zone` around the adsorbate, including the repeated
    /// shells of hollow-site zones.
    pub fn zone_symbols(
        &mut self,
        zone: ZoneKind,
        geometry: SiteGeometry,
    ) -> Result<Vec<String>, GeometryError> {
        let site = if zone.needs_site(geometry) {
            Some(self.site()?.clone())
        } else {
            None
        };

        let adsorbate = self.adsorbate_id()?;
        let mut symbols = Vec::new();
        for shell in shell_plan(zone, geometry, site.as_ref())? {
            let atoms = nearest_shell(self.tiled(), adsorbate, shell.layer, shell.start, shell.stop)?;
            for _ in 0..shell.repeat {
                symbols.extend(atoms.iter().map(|atom| atom.symbol.clone()));
            }
        }
        Ok(symbols)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{NN, fcc111_slab};
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::{Matrix3, Point3};

    const PT9: [&str; 9] = ["Pt"; 9];
    const THIRD: f64 = 1.0 / 3.0;

    fn on_top_slab() -> Slab {
        Slab::new(fcc111_slab(PT9, PT9, (1.0, 1.0), 2.0))
    }

    #[test]
    fn locate_adsorbate_returns_central_replica_atom() {
        let slab = on_top_slab();
        let per_replica = slab.structure().len();
        let id = slab.adsorbate_id().unwrap();
        // The adsorbate is the last atom of each replica; the central replica is number 4.
        assert_eq!(id, 4 * per_replica + per_replica - 1);
    }

    #[test]
    fn locate_adsorbate_fails_without_adsorbate() {
        let atoms = vec![Atom::new("Pt", Point3::origin(), LayerTag::Surface)];
        let structure = AtomicStructure::new(atoms, Matrix3::identity());
        assert_eq!(
            locate_adsorbate(&tile(&structure)),
            Err(GeometryError::NoAdsorbate)
        );
    }

    #[test]
    fn locate_adsorbate_uses_first_atom_of_multi_atom_adsorbates() {
        let mut structure = fcc111_slab(PT9, PT9, (1.0, 1.0), 2.0);
        let mut atoms = structure.atoms().to_vec();
        let o = atoms.last().unwrap().clone();
        let mut h = o.clone();
        h.symbol = "H".to_string();
        h.position.z += 1.0;
        atoms.push(h);
        structure = AtomicStructure::new(atoms, *structure.cell());
        let n = structure.len();

        let tiled = tile(&structure);
        let id = locate_adsorbate(&tiled).unwrap();
        assert_eq!(id, 4 * n + n - 2);
        assert_eq!(tiled.atoms()[id].symbol, o.symbol);
    }

    #[test]
    fn nearest_shell_ranks_on_top_neighbors() {
        let slab = on_top_slab();
        let first = slab.nearest_shell(LayerTag::Surface, 1, 1).unwrap();
        assert_eq!(first.len(), 1);
        let ads = slab.adsorbate_id().unwrap();
        let atoms = slab.tiled().atoms();
        let dxy = atoms[first[0].id].position - atoms[ads].position;
        assert!(dxy.x.hypot(dxy.y) < 1e-9);

        let ring = slab.nearest_shell(LayerTag::Surface, 2, 7).unwrap();
        assert_eq!(ring.len(), 6);
        for atom in &ring {
            let d = atoms[atom.id].position - atoms[first[0].id].position;
            assert!((d.norm() - NN).abs() < 1e-9);
        }
        assert!(ring.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn nearest_shell_rejects_invalid_ranks() {
        let slab = on_top_slab();
        assert!(matches!(
            slab.nearest_shell(LayerTag::Surface, 0, 3),
            Err(GeometryError::ShellOutOfRange { .. })
        ));
        assert!(matches!(
            slab.nearest_shell(LayerTag::Surface, 4, 3),
            Err(GeometryError::ShellOutOfRange { .. })
        ));
        assert!(matches!(
            slab.nearest_shell(LayerTag::Surface, 1, 82),
            Err(GeometryError::ShellOutOfRange { available: 81, .. })
        ));
    }

    #[test]
    fn nearest_shell_breaks_distance_ties_by_atom_id() {
        let atoms = vec![
            Atom::new("O", Point3::new(0.0, 0.0, 1.0), LayerTag::Adsorbate),
            Atom::new("Rh", Point3::new(-1.0, 0.0, 0.0), LayerTag::Surface),
            Atom::new("Ir", Point3::new(0.0, 0.0, 0.0), LayerTag::Surface),
            Atom::new("Pd", Point3::new(1.0, 0.0, 0.0), LayerTag::Surface),
        ];
        let structure = AtomicStructure::new(atoms, Matrix3::identity());

        let second = nearest_shell(&structure, 0, LayerTag::Surface, 2, 2).unwrap();
        assert_eq!(second, vec![ShellAtom { symbol: "Rh".to_string(), id: 1 }]);
        let third = nearest_shell(&structure, 0, LayerTag::Surface, 3, 3).unwrap();
        assert_eq!(third[0].id, 3);
    }

    #[test]
    fn hollow_above_subsurface_atom_is_hcp() {
        // Subsurface atoms sit at fractional (2/3, 2/3) within each surface cell.
        let mut subsurface = PT9;
        subsurface[4] = "Ru";
        let structure = fcc111_slab(PT9, subsurface, (1.0 + 2.0 * THIRD, 1.0 + 2.0 * THIRD), 1.2);
        let mut slab = Slab::new(structure);
        assert_eq!(slab.site_state(), &SiteState::Unclassified);

        let site = slab.site().unwrap().clone();
        match site {
            SiteClassification::Hcp {
                blocking_symbol, ..
            } => assert_eq!(blocking_symbol, "Ru"),
            SiteClassification::Fcc => panic!("expected an hcp site"),
        }
        assert!(matches!(
            slab.site_state(),
            SiteState::Classified(SiteClassification::Hcp { .. })
        ));
    }

    #[test]
    fn hollow_above_interior_atom_is_fcc() {
        let structure = fcc111_slab(PT9, PT9, (1.0 + THIRD, 1.0 + THIRD), 1.2);
        let mut slab = Slab::new(structure);
        assert_eq!(slab.site().unwrap(), &SiteClassification::Fcc);
    }

    #[test]
    fn distortion_check_is_strict_at_the_limit() {
        let structure = fcc111_slab(PT9, PT9, (1.0, 1.0), 2.0);
        let limit = slab_height_limit(NN, 1.10);
        let place_surface_at = |z: f64| {
            let atoms = structure
                .atoms()
                .iter()
                .cloned()
                .map(|mut atom| {
                    if atom.tag == LayerTag::Surface {
                        atom.position.z = z;
                    }
                    atom
                })
                .collect();
            AtomicStructure::new(atoms, *structure.cell())
        };

        assert!(!is_distorted(&place_surface_at(limit), 1.10).unwrap());
        assert!(is_distorted(&place_surface_at(limit + 1e-6), 1.10).unwrap());
        assert!(!is_distorted(&structure, 1.10).unwrap());
    }

    #[test]
    fn distortion_check_requires_bottom_layer() {
        let atoms = vec![Atom::new("Pt", Point3::origin(), LayerTag::Surface)];
        let structure = AtomicStructure::new(atoms, Matrix3::identity());
        assert!(matches!(
            is_distorted(&structure, 1.1),
            Err(GeometryError::MissingLayer {
                layer: LayerTag::Bottom,
                ..
            })
        ));
    }

    #[test]
    fn on_top_check_uses_in_plane_distance() {
        assert!(on_top_slab().is_on_top(0.7).unwrap());
        let hollow = Slab::new(fcc111_slab(PT9, PT9, (1.0 + THIRD, 1.0 + THIRD), 1.2));
        assert!(!hollow.is_on_top(0.7).unwrap());
    }

    #[test]
    fn zone_symbols_collect_on_top_shells() {
        let mut surface = PT9;
        surface[4] = "Ir";
        let mut slab = Slab::new(fcc111_slab(surface, PT9, (1.0, 1.0), 2.0));

        let ensemble = slab.zone_symbols(ZoneKind::Ensemble, SiteGeometry::OnTop).unwrap();
        assert_eq!(ensemble, vec!["Ir".to_string()]);

        let ring = slab.zone_symbols(ZoneKind::Surface, SiteGeometry::OnTop).unwrap();
        assert_eq!(ring.len(), 6);
        assert!(ring.iter().all(|s| s == "Pt"));

        let sub = slab.zone_symbols(ZoneKind::Subsurface, SiteGeometry::OnTop).unwrap();
        assert_eq!(sub.len(), 3);
    }

    #[test]
    fn zone_symbols_double_count_hollow_shells() {
        let mut slab = Slab::new(fcc111_slab(PT9, PT9, (1.0 + THIRD, 1.0 + THIRD), 1.2));
        let surface = slab.zone_symbols(ZoneKind::Surface, SiteGeometry::Hollow).unwrap();
        assert_eq!(surface.len(), 12);
        let sub = slab.zone_symbols(ZoneKind::Subsurface, SiteGeometry::Hollow).unwrap();
        assert_eq!(sub.len(), 9);
        assert!(matches!(slab.site_state(), SiteState::Classified(SiteClassification::Fcc)));
    }
}
