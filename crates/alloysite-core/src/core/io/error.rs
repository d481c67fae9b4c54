use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },

    #[error("TOML serialization error for '{path}': {source}")]
    TomlSerialize {
        path: String,
        source: toml::ser::Error,
    },

    #[error("Malformed row {row} in '{path}': {message}")]
    MalformedRow {
        path: String,
        row: usize,
        message: String,
    },
}

impl IoError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        IoError::Io {
            path: path.to_string_lossy().to_string(),
            source,
        }
    }

    pub(crate) fn csv(path: &std::path::Path, source: csv::Error) -> Self {
        IoError::Csv {
            path: path.to_string_lossy().to_string(),
            source,
        }
    }

    pub(crate) fn malformed(path: &std::path::Path, row: usize, message: impl Into<String>) -> Self {
        IoError::MalformedRow {
            path: path.to_string_lossy().to_string(),
            row,
            message: message.into(),
        }
    }
}
