//! File formats read and written by the library.
//!
//! - [`dataset`] - header-less fingerprint/energy CSV files and prediction lists
//! - [`table`] - enumeration tables and their per-ensemble shards
//! - [`manifest`] - TOML sample manifests describing relaxed structures

pub mod dataset;
pub mod error;
pub mod manifest;
pub mod table;
