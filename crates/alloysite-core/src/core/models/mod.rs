//! # Core Models Module
//!
//! Data structures describing a periodic alloy slab with an adsorbate on top.
//!
//! - [`atom`] - Individual atoms with their element symbol, position and layer tag
//! - [`structure`] - Ordered atom collections with a periodic cell and replication
//!
//! ```ignore
//! use alloysite::core::models::{atom::{Atom, LayerTag}, structure::AtomicStructure};
//!
//! let cell = Matrix3::new(8.3, 0.0, 0.0, 4.15, 7.19, 0.0, 0.0, 0.0, 25.0);
//! let structure = AtomicStructure::new(atoms, cell);
//! let tiled = structure.repeat(3, 3, 1);
//! ```

pub mod atom;
pub mod structure;
