use nalgebra::Point3;
use std::str::FromStr;

/// Classifies an atom by the slab layer it belongs to.
///
/// Tags follow the usual surface-science convention for slab builders: layers are
/// counted from the top, with the adsorbate tagged `0`. Only the layers the site
/// geometry needs are distinguished; everything between the subsurface and the
/// fixed bottom layer is [`LayerTag::Interior`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerTag {
    /// Atom of the adsorbed molecule (e.g. O, or O and H of OH).
    Adsorbate,
    /// Topmost metal layer.
    Surface,
    /// Metal layer directly beneath the surface.
    Subsurface,
    /// Any metal layer between the subsurface and the bottom layer.
    Interior,
    /// Fixed bottom metal layer of a four-layer slab.
    Bottom,
}

impl LayerTag {
    /// Returns the integer tag used by slab builders for this layer.
    pub fn as_tag(self) -> u8 {
        match self {
            LayerTag::Adsorbate => 0,
            LayerTag::Surface => 1,
            LayerTag::Subsurface => 2,
            LayerTag::Interior => 3,
            LayerTag::Bottom => 4,
        }
    }
}

impl TryFrom<u8> for LayerTag {
    type Error = u8;

    /// Converts an integer slab tag into a `LayerTag`.
    ///
    /// # Errors
    ///
    /// Returns the rejected tag if it does not name a known layer.
    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(LayerTag::Adsorbate),
            1 => Ok(LayerTag::Surface),
            2 => Ok(LayerTag::Subsurface),
            3 => Ok(LayerTag::Interior),
            4 => Ok(LayerTag::Bottom),
            other => Err(other),
        }
    }
}

impl FromStr for LayerTag {
    type Err = ();

    /// Parses a layer name (case-insensitive), e.g. `"surface"` or `"sub-surface"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adsorbate" => Ok(LayerTag::Adsorbate),
            "surface" => Ok(LayerTag::Surface),
            "subsurface" | "sub-surface" | "sub_surface" => Ok(LayerTag::Subsurface),
            "interior" => Ok(LayerTag::Interior),
            "bottom" => Ok(LayerTag::Bottom),
            _ => Err(()),
        }
    }
}

/// A single atom of a slab or adsorbate.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Chemical element symbol (e.g. "Pt", "O").
    pub symbol: String,
    /// Cartesian position in Angstroms.
    pub position: Point3<f64>,
    /// Layer the atom belongs to.
    pub tag: LayerTag,
}

impl Atom {
    pub fn new(symbol: &str, position: Point3<f64>, tag: LayerTag) -> Self {
        Self {
            symbol: symbol.to_string(),
            position,
            tag,
        }
    }
}
