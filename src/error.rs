//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, HTTP, and JSON errors, and provides semantic variants
//! for the pipeline failure taxonomy: authentication, empty retrieval, band
//! validation, and remote computation failures. Per-job export outcomes live
//! in `service::export::JobOutcome`.
use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Remote computation failure, surfaced verbatim from the service.
    #[error("Service error: {message}")]
    Service { message: String },

    #[error(
        "No scenes found in {collection} between {start} and {end} \
         (scene cloud cover < {max_cloud_percent}%)"
    )]
    NoScenes {
        collection: String,
        start: NaiveDate,
        end: NaiveDate,
        max_cloud_percent: f64,
    },

    #[error("Band '{band}' is not present in the source image")]
    MissingBand { band: String },

    #[error("Band '{band}' already exists; index bands may only be appended")]
    DuplicateBand { band: String },

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },
}

impl Error {
    pub fn service<M: std::fmt::Display>(message: M) -> Self {
        Error::Service {
            message: message.to_string(),
        }
    }
}
