//! # alloysite Core Library
//!
//! Predictive modelling of adsorption energies on multi-metal alloy surfaces from
//! geometric fingerprints of adsorption sites.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`AtomicStructure`), slab
//!   geometry (neighbor shells, fcc/hcp classification), combinatorics and file I/O.
//!
//! - **[`engine`]: The Logic Core.** The fingerprint encoder, the gauge-fixed least
//!   squares regression, and the enumerator that walks the complete fingerprint space
//!   with statistical multiplicities.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures (featurizing a structure
//!   library, fitting and evaluating a model, enumerating every fingerprint to disk)
//!   built on top of `engine` and `core`.

pub mod core;
pub mod engine;
pub mod workflows;
