use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the dashboard's input tables
///
/// Every variant is fatal for the page that triggered the load. Empty
/// filter results are not errors; the shaping functions report those as
/// `None` instead.
#[derive(Debug, Error)]
pub enum DataError {
    /// The file could not be opened or read
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not well-formed delimited text
    #[error("malformed table in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from the header row
    #[error("{path} has no {column} column")]
    MissingColumn { path: PathBuf, column: &'static str },

    /// No header matched any accepted spelling for a concept
    #[error(
        "could not find {concept} in {path}; add a column named {canonical} or one of its synonyms ({synonyms})"
    )]
    UnresolvedHeader {
        path: PathBuf,
        concept: &'static str,
        canonical: &'static str,
        synonyms: String,
    },

    /// The file extension is not a delimited text format
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        DataError::Csv {
            path: path.into(),
            source,
        }
    }
}
