use alloysite::core::geometry::zones::{SiteGeometry, ZoneKind};
use alloysite::engine::config::{HollowSite, Zone};
use alloysite::engine::energetics::Adsorbate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidAssignment(String),

    #[error("Unknown site geometry '{0}'. Expected 'on-top' or 'hollow'.")]
    UnknownGeometry(String),

    #[error("Unknown adsorbate '{0}'. Expected 'o' or 'oh'.")]
    UnknownAdsorbate(String),

    #[error("Unknown hollow site '{0}'. Expected 'fcc' or 'hcp'.")]
    UnknownHollowSite(String),

    #[error("Invalid zone '{0}'. Expected 'kind:size' (e.g., 'ens:1', 'surface:6').")]
    InvalidZone(String),

    #[error("List '{0}' is empty.")]
    EmptyList(String),
}

/// Splits `key=value` at the first `=`.
pub fn parse_assignment(pair: &str) -> Result<(&str, &str), ParseError> {
    pair.split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| ParseError::InvalidAssignment(pair.to_string()))
}

pub fn parse_geometry(value: &str) -> Result<SiteGeometry, ParseError> {
    match value.to_ascii_lowercase().as_str() {
        "on-top" | "ontop" | "top" => Ok(SiteGeometry::OnTop),
        "hollow" => Ok(SiteGeometry::Hollow),
        _ => Err(ParseError::UnknownGeometry(value.to_string())),
    }
}

pub fn parse_adsorbate(value: &str) -> Result<Adsorbate, ParseError> {
    match value.to_ascii_lowercase().as_str() {
        "o" => Ok(Adsorbate::O),
        "oh" => Ok(Adsorbate::Oh),
        _ => Err(ParseError::UnknownAdsorbate(value.to_string())),
    }
}

pub fn parse_hollow_site(value: &str) -> Result<HollowSite, ParseError> {
    match value.to_ascii_lowercase().as_str() {
        "fcc" => Ok(HollowSite::Fcc),
        "hcp" => Ok(HollowSite::Hcp),
        _ => Err(ParseError::UnknownHollowSite(value.to_string())),
    }
}

/// Comma-separated metal symbols, e.g. `Ir,Pd,Pt`.
pub fn parse_metal_list(value: &str) -> Result<Vec<String>, ParseError> {
    let metals: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|symbol| !symbol.is_empty())
        .map(str::to_string)
        .collect();
    if metals.is_empty() {
        return Err(ParseError::EmptyList(value.to_string()));
    }
    Ok(metals)
}

/// Comma-separated `kind:size` pairs, e.g. `ens:1,s:6,ss:3`.
pub fn parse_zone_list(value: &str) -> Result<Vec<Zone>, ParseError> {
    let zones = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ParseError::InvalidZone(entry.to_string());
            let (kind, size) = entry.split_once(':').ok_or_else(invalid)?;
            let kind: ZoneKind = kind.trim().parse().map_err(|_| invalid())?;
            let size: usize = size.trim().parse().map_err(|_| invalid())?;
            Ok(Zone::new(kind, size))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if zones.is_empty() {
        return Err(ParseError::EmptyList(value.to_string()));
    }
    Ok(zones)
}
