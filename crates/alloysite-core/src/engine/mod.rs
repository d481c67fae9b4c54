//! # Engine Module
//!
//! The algorithms behind the adsorption-energy model: turning site geometry into
//! fingerprints, fitting a degeneracy-free linear model to them, and walking the
//! complete fingerprint space with its statistical weights.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Zone schedules, metal vocabularies, model and
//!   workflow settings with validating builders
//! - **Feature Encoding** ([`fingerprint`]) - Ensemble one-hot plus per-zone metal counts
//! - **Regression** ([`regression`]) - Least squares with zero-column removal, reference
//!   pinning and gauge fixing; prediction and error metrics
//! - **Enumeration** ([`enumeration`]) - Lazy traversal of every fingerprint with its
//!   multiplicity, chunked table emission and mixed-radix index decoding
//! - **Aggregation** ([`histogram`]) - Multiplicity-weighted energy histograms
//! - **Energetics** ([`energetics`]) - Adsorption energies from total energies
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - The aggregate [`error::EngineError`]

pub mod config;
pub mod energetics;
pub mod enumeration;
pub mod error;
pub mod fingerprint;
pub mod histogram;
pub mod progress;
pub mod regression;
