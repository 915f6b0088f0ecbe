use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid {arg}: {value}")]
    InvalidOverride { arg: &'static str, value: String },

    #[error("{failed} of {total} export jobs did not succeed")]
    ExportsFailed { failed: usize, total: usize },

    #[error(transparent)]
    Pipeline(#[from] soilscan::Error),
}
