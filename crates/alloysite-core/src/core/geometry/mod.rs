//! Adsorption-site geometry on periodic alloy slabs.
//!
//! A [`slab::Slab`] wraps one relaxed structure and answers every geometric
//! question the fingerprint needs: where the adsorbate sits, which metal atoms
//! surround it in each layer (ranked by distance), whether a three-fold hollow is
//! an fcc or an hcp site, and whether the slab relaxed into something unusable.
//! [`zones`] maps each fingerprint zone to the neighbor shells it is built from.

pub mod error;
pub mod slab;
pub mod triangle;
pub mod zones;
