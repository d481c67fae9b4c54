use thiserror::Error;

use super::config::ConfigError;
use super::enumeration::EnumerationError;
use super::fingerprint::EncodingError;
use super::histogram::HistogramError;
use super::regression::RegressionError;
use crate::core::geometry::error::GeometryError;
use crate::core::io::error::IoError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Site geometry failed: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },

    #[error("Fingerprint encoding failed: {source}")]
    Encoding {
        #[from]
        source: EncodingError,
    },

    #[error("Regression failed: {source}")]
    Regression {
        #[from]
        source: RegressionError,
    },

    #[error("Enumeration failed: {source}")]
    Enumeration {
        #[from]
        source: EnumerationError,
    },

    #[error("Histogram aggregation failed: {source}")]
    Histogram {
        #[from]
        source: HistogramError,
    },

    #[error("{source}")]
    Io {
        #[from]
        source: IoError,
    },

    #[error("Sample {index} ('{id}') failed: {source}")]
    Sample {
        index: usize,
        id: String,
        source: Box<EngineError>,
    },

    #[error("No usable samples: all {rejected} sample(s) were rejected")]
    NoSamples { rejected: usize },
}
