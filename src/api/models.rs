use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_models::{JobListing, SearchResult, VideoResult};
use crate::error::UpstreamError;

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct QueriesResponse {
    pub queries: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse<T> {
    pub results: Vec<T>,
}

pub type WebResultsResponse = ResultsResponse<SearchResult>;
pub type VideoResultsResponse = ResultsResponse<VideoResult>;

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<JobListing>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(e) if e.is_timeout() => {
                tracing::warn!(error = %e, "upstream timed out");
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Upstream(e) => {
                tracing::warn!(error = %e, "upstream failure");
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorBody {
            detail: self.to_string(),
        });
        (status, body).into_response()
    }
}
