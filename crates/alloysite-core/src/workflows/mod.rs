//! # Workflows Module
//!
//! End-to-end procedures built from the engine and core layers. Each workflow takes
//! validated configuration plus a [`ProgressReporter`](crate::engine::progress::ProgressReporter)
//! and returns a structured result or an [`EngineError`](crate::engine::error::EngineError).
//!
//! - [`featurize`] - Sample library to fingerprint dataset, with rejection bookkeeping
//! - [`regression`] - Fit on a training set, evaluate on training and test sets
//! - [`enumerate`] - Predict the whole fingerprint space and aggregate energy histograms

pub mod enumerate;
pub mod featurize;
pub mod regression;
