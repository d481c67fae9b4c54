//! # Core Module
//!
//! Fundamental building blocks for describing alloy slabs and their adsorption sites.
//!
//! ## Architecture
//!
//! - **Structure Representation** ([`models`]) - Atoms, layer tags and periodic structures
//! - **Site Geometry** ([`geometry`]) - Periodic tiling, neighbor shells, hollow-site
//!   classification and zone extraction around an adsorbate
//! - **File I/O** ([`io`]) - Fingerprint datasets, prediction and enumeration tables,
//!   sample manifests
//! - **Utilities** ([`utils`]) - Multiset combinatorics shared by the encoder and the
//!   enumerator

pub mod geometry;
pub mod io;
pub mod models;
pub mod utils;
