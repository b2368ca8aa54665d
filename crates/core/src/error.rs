//! Error types for the splitter.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: cannot parse {field} from {value:?}")]
    SwcField {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{0}: anchor table has no header row")]
    NoHeader(PathBuf),

    #[error("{path}: no column for axis '{axis}' among {headers:?}")]
    MissingColumn {
        path: PathBuf,
        axis: char,
        headers: Vec<String>,
    },

    #[error("{path}: row {row}: cannot parse {column:?} value {value:?}")]
    AnchorValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("{0}: no anchors found")]
    NoAnchors(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SplitError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SplitError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;
