use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use sectorflow_core::error::AnalysisError;

#[derive(Debug)]
pub enum ApiError {
    /// No data store is configured or reachable.
    Unavailable,
    Analysis(AnalysisError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        ApiError::Analysis(err)
    }
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::Analysis(AnalysisError::InvalidParameter(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Analysis(AnalysisError::MissingParameter(_))
            | ApiError::Analysis(AnalysisError::InvalidParameter(_)) => StatusCode::BAD_REQUEST,
            ApiError::Analysis(AnalysisError::NoDataFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Analysis(AnalysisError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unavailable => "data store unavailable".to_string(),
            ApiError::Analysis(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Analysis(AnalysisError::Store(err)) = &self {
            sentry_anyhow::capture_anyhow(err);
            tracing::error!(error = %err, "request failed on data store");
        }

        let status = self.status();
        (status, Json(ErrorBody { error: self.message() })).into_response()
    }
}
