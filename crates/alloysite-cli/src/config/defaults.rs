use alloysite::core::geometry::zones::{SiteGeometry, ZoneKind};
use alloysite::engine::config::{DEFAULT_ON_TOP_DISTANCE, HollowSite, Zone};
use alloysite::engine::energetics::Adsorbate;
use alloysite::engine::histogram::BinSpec;
use clap::ValueEnum;
use serde::Deserialize;

const PLATINUM_GROUP: [&str; 5] = ["Ir", "Pd", "Pt", "Rh", "Ru"];

/// Built-in model definitions for the platinum-group high-entropy alloy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
pub enum Preset {
    /// *OH on top of one surface atom; zones ensemble(1), surface(6), subsurface(3).
    #[value(name = "oh-on-top")]
    #[serde(rename = "oh-on-top")]
    OhOnTop,
    /// *O in fcc hollow sites; zones ensemble(3), surface-far(6), subsurface-far(3),
    /// surface-near(3), subsurface-near(3).
    #[value(name = "o-fcc-hollow")]
    #[serde(rename = "o-fcc-hollow")]
    OFccHollow,
}

pub struct DefaultsConfig {
    pub geometry: SiteGeometry,
    pub metals: Vec<String>,
    pub zones: Vec<Zone>,
    pub adsorbate: Adsorbate,
    pub on_top_distance: Option<f64>,
    pub required_site: Option<HollowSite>,
    pub bins: BinSpec,
}

impl DefaultsConfig {
    pub fn for_preset(preset: Preset) -> Self {
        let metals = PLATINUM_GROUP.iter().map(|m| m.to_string()).collect();
        match preset {
            Preset::OhOnTop => Self {
                geometry: SiteGeometry::OnTop,
                metals,
                zones: vec![
                    Zone::new(ZoneKind::Ensemble, 1),
                    Zone::new(ZoneKind::Surface, 6),
                    Zone::new(ZoneKind::Subsurface, 3),
                ],
                adsorbate: Adsorbate::Oh,
                on_top_distance: Some(DEFAULT_ON_TOP_DISTANCE),
                required_site: None,
                bins: BinSpec {
                    start: 0.0,
                    stop: 1.5,
                    width: 0.007,
                },
            },
            Preset::OFccHollow => Self {
                geometry: SiteGeometry::Hollow,
                metals,
                zones: vec![
                    Zone::new(ZoneKind::Ensemble, 3),
                    Zone::new(ZoneKind::SurfaceFar, 6),
                    Zone::new(ZoneKind::SubsurfaceFar, 3),
                    Zone::new(ZoneKind::SurfaceNear, 3),
                    Zone::new(ZoneKind::SubsurfaceNear, 3),
                ],
                adsorbate: Adsorbate::O,
                on_top_distance: None,
                required_site: Some(HollowSite::Fcc),
                bins: BinSpec {
                    start: -0.5,
                    stop: 2.5075,
                    width: 0.0075,
                },
            },
        }
    }
}
