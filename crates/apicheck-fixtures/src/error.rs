//! Fixture errors.

use apicheck_core::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("fixture file not found: {path}")]
    NotFound { path: String },

    #[error("cannot read fixture file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed fixture file '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("cannot read workbook '{path}': {source}")]
    Workbook {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("sheet '{sheet}' not found in workbook '{path}'")]
    MissingSheet { path: String, sheet: String },

    #[error("fixture file '{path}' has no data rows")]
    Empty { path: String },

    #[error("fixture file '{path}' is missing column '{column}'")]
    MissingColumn { path: String, column: String },
}

impl From<FixtureError> for ApiError {
    fn from(err: FixtureError) -> Self {
        ApiError::Configuration(err.to_string())
    }
}
