use super::error::GeometryError;
use super::slab::SiteClassification;
use crate::core::models::atom::LayerTag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the adsorbate binds to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteGeometry {
    /// Bound to a single surface atom (e.g. *OH).
    OnTop,
    /// Bound in a three-fold hollow between three surface atoms (e.g. *O).
    Hollow,
}

impl SiteGeometry {
    /// Number of surface atoms the adsorbate binds to.
    pub fn ensemble_size(self) -> usize {
        match self {
            SiteGeometry::OnTop => 1,
            SiteGeometry::Hollow => 3,
        }
    }
}

/// A named shell of atoms around the adsorption ensemble.
///
/// The ensemble zone is one-hot encoded over all metal multisets; every other zone
/// contributes per-metal atom counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneKind {
    Ensemble,
    Surface,
    Subsurface,
    SurfaceNear,
    SurfaceFar,
    SubsurfaceNear,
    SubsurfaceFar,
}

impl ZoneKind {
    pub fn is_ensemble(self) -> bool {
        matches!(self, ZoneKind::Ensemble)
    }

    /// Whether the zone's shells depend on the fcc/hcp classification of a hollow site.
    pub fn needs_site(self, geometry: SiteGeometry) -> bool {
        geometry == SiteGeometry::Hollow
            && matches!(
                self,
                ZoneKind::Subsurface | ZoneKind::SubsurfaceNear | ZoneKind::SubsurfaceFar
            )
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ZoneKind::Ensemble => "ensemble",
            ZoneKind::Surface => "surface",
            ZoneKind::Subsurface => "subsurface",
            ZoneKind::SurfaceNear => "surface-near",
            ZoneKind::SurfaceFar => "surface-far",
            ZoneKind::SubsurfaceNear => "subsurface-near",
            ZoneKind::SubsurfaceFar => "subsurface-far",
        };
        f.write_str(name)
    }
}

impl FromStr for ZoneKind {
    type Err = ();

    /// Parses a zone name; accepts the kebab-case names and the short aliases
    /// `ens`, `s`, `ss`, `sn`, `sf`, `ssn` and `ssf`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ensemble" | "ens" => Ok(ZoneKind::Ensemble),
            "surface" | "s" => Ok(ZoneKind::Surface),
            "subsurface" | "ss" => Ok(ZoneKind::Subsurface),
            "surface-near" | "sn" => Ok(ZoneKind::SurfaceNear),
            "surface-far" | "sf" => Ok(ZoneKind::SurfaceFar),
            "subsurface-near" | "ssn" => Ok(ZoneKind::SubsurfaceNear),
            "subsurface-far" | "ssf" => Ok(ZoneKind::SubsurfaceFar),
            _ => Err(()),
        }
    }
}

/// An inclusive, 1-indexed rank interval of a distance-sorted layer, counted
/// `repeat` times in the zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellSpec {
    pub layer: LayerTag,
    pub start: usize,
    pub stop: usize,
    pub repeat: usize,
}

impl ShellSpec {
    const fn once(layer: LayerTag, start: usize, stop: usize) -> Self {
        Self {
            layer,
            start,
            stop,
            repeat: 1,
        }
    }

    const fn times(layer: LayerTag, start: usize, stop: usize, repeat: usize) -> Self {
        Self {
            layer,
            start,
            stop,
            repeat,
        }
    }

    /// Number of symbols this shell contributes to its zone.
    pub fn atom_count(&self) -> usize {
        (self.stop + 1 - self.start) * self.repeat
    }
}

/// Returns the neighbor shells that make up `zone` for the given adsorption geometry.
///
/// Shells of a hollow site that lie close to the ensemble are counted several times
/// so that every zone keeps the three-fold symmetry of the site. `site` is only
/// consulted for subsurface zones of hollow sites.
///
/// # Errors
///
/// Returns [`GeometryError::UnsupportedZone`] for the far zones of on-top sites.
pub fn shell_plan(
    zone: ZoneKind,
    geometry: SiteGeometry,
    site: Option<&SiteClassification>,
) -> Result<Vec<ShellSpec>, GeometryError> {
    use LayerTag::{Subsurface as SS, Surface as S};

    let is_hcp = matches!(site, Some(SiteClassification::Hcp { .. }));

    let plan = match (geometry, zone) {
        (SiteGeometry::OnTop, ZoneKind::Ensemble) => vec![ShellSpec::once(S, 1, 1)],
        (SiteGeometry::OnTop, ZoneKind::Surface | ZoneKind::SurfaceNear) => {
            vec![ShellSpec::once(S, 2, 7)]
        }
        (SiteGeometry::OnTop, ZoneKind::Subsurface | ZoneKind::SubsurfaceNear) => {
            vec![ShellSpec::once(SS, 1, 3)]
        }
        (SiteGeometry::OnTop, ZoneKind::SurfaceFar | ZoneKind::SubsurfaceFar) => {
            return Err(GeometryError::UnsupportedZone { zone, geometry });
        }

        (SiteGeometry::Hollow, ZoneKind::Ensemble) => vec![ShellSpec::once(S, 1, 3)],
        (SiteGeometry::Hollow, ZoneKind::Surface) => {
            vec![ShellSpec::times(S, 4, 6, 2), ShellSpec::once(S, 7, 12)]
        }
        (SiteGeometry::Hollow, ZoneKind::SurfaceNear) => vec![ShellSpec::once(S, 4, 6)],
        (SiteGeometry::Hollow, ZoneKind::SurfaceFar) => vec![ShellSpec::once(S, 7, 12)],
        (SiteGeometry::Hollow, ZoneKind::Subsurface) if is_hcp => {
            vec![ShellSpec::times(SS, 1, 1, 3), ShellSpec::once(SS, 2, 7)]
        }
        (SiteGeometry::Hollow, ZoneKind::Subsurface) => {
            vec![ShellSpec::times(SS, 1, 3, 2), ShellSpec::once(SS, 4, 6)]
        }
        (SiteGeometry::Hollow, ZoneKind::SubsurfaceNear) if is_hcp => {
            vec![ShellSpec::once(SS, 1, 1)]
        }
        (SiteGeometry::Hollow, ZoneKind::SubsurfaceNear) => vec![ShellSpec::once(SS, 1, 3)],
        (SiteGeometry::Hollow, ZoneKind::SubsurfaceFar) if is_hcp => {
            vec![ShellSpec::once(SS, 2, 7)]
        }
        (SiteGeometry::Hollow, ZoneKind::SubsurfaceFar) => vec![ShellSpec::once(SS, 4, 6)],
    };
    Ok(plan)
}
