use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FusionError>;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("No {channel} brightness-temperature variable found in {path:?}")]
    ChannelNotFound { channel: String, path: PathBuf },

    #[error(
        "Geolocation grid {geo_rows}x{geo_cols} incompatible with value grid {value_rows}x{value_cols} in {path:?}"
    )]
    GridAlignment {
        path: PathBuf,
        geo_rows: usize,
        geo_cols: usize,
        value_rows: usize,
        value_cols: usize,
    },

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl FusionError {
    /// Errors that abort a batch run rather than skipping the current unit.
    ///
    /// Everything else (unreadable swath file, missing variable, malformed
    /// row) is logged at the call site and the file or day is skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FusionError::Io(_) | FusionError::Config(_))
    }
}
