#[cfg(feature = "python")]
use pyo3::exceptions::PyRuntimeError;
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

/// Broad failure categories a host can branch on.
///
/// Fetch failures are recoverable (offer a retry); parse failures are fatal
/// for the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Fetch,
    Parse,
    Config,
    Lookup,
}

#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to fetch {url} after {attempts} attempt(s): {source}")]
    FetchFailed {
        url: String,
        attempts: u32,
        source: Box<TrajectoryError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid date column '{column}': {reason}")]
    InvalidDateColumn { column: String, reason: String },

    #[error("Invalid case count '{value}' for {location} on {date}")]
    InvalidCount {
        location: String,
        date: String,
        value: String,
    },

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Data not loaded: {0}")]
    NotLoaded(String),
}

pub type Result<T> = std::result::Result<T, TrajectoryError>;

impl TrajectoryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Http(_) | Self::HttpStatus { .. } | Self::FetchFailed { .. } | Self::Io(_) => {
                FailureKind::Fetch
            }
            Self::Polars(_)
            | Self::MissingColumn(_)
            | Self::InvalidDateColumn { .. }
            | Self::InvalidCount { .. }
            | Self::InvalidData(_)
            | Self::Json(_) => FailureKind::Parse,
            Self::Config(_) | Self::Toml(_) => FailureKind::Config,
            Self::UnknownLocation(_) | Self::NotLoaded(_) => FailureKind::Lookup,
        }
    }

    /// Transport errors, 5xx and 429 are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(feature = "python")]
impl From<TrajectoryError> for PyErr {
    fn from(err: TrajectoryError) -> PyErr {
        PyRuntimeError::new_err(err.to_string())
    }
}
