use thiserror::Error;

/// Failure of a single analysis request. None of these are fatal to the process.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0} is required")]
    MissingParameter(&'static str),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no data found: {0}")]
    NoDataFound(String),

    #[error("data store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
