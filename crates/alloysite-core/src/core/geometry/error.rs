use super::zones::{SiteGeometry, ZoneKind};
use crate::core::models::atom::LayerTag;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("No adsorbate atom (tag 0) found in the tiled structure")]
    NoAdsorbate,

    #[error("Atom {atom} carries malformed layer tag {tag}")]
    MalformedTag { atom: usize, tag: i64 },

    #[error(
        "Neighbor shell ranks {start}..={stop} are out of range for layer {layer:?} ({available} atoms available)"
    )]
    ShellOutOfRange {
        layer: LayerTag,
        start: usize,
        stop: usize,
        available: usize,
    },

    #[error("Layer {layer:?} needs at least {required} atom(s), found {found}")]
    MissingLayer {
        layer: LayerTag,
        required: usize,
        found: usize,
    },

    #[error("Zone {zone:?} is not defined for {geometry:?} adsorption")]
    UnsupportedZone {
        zone: ZoneKind,
        geometry: SiteGeometry,
    },
}
