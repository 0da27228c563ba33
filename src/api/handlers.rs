use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};

use crate::data_models::{DEFAULT_RESULTS, MAX_RESULTS};

use super::AppState;
use super::models::{
    ApiError, JobsResponse, MessageResponse, QueriesResponse, QueryParams, ResultsResponse,
    SearchParams, VideoResultsResponse, WebResultsResponse,
};

fn require_query(query: Option<String>) -> Result<String, ApiError> {
    match query {
        Some(q) if !q.trim().is_empty() => Ok(q.trim().to_string()),
        _ => Err(ApiError::BadRequest(
            "Query parameter 'query' is required".to_string(),
        )),
    }
}

fn result_count(count: Option<u32>) -> Result<u32, ApiError> {
    match count {
        None => Ok(DEFAULT_RESULTS),
        Some(n) if (1..=MAX_RESULTS).contains(&n) => Ok(n),
        Some(n) => Err(ApiError::BadRequest(format!(
            "count must be between 1 and {MAX_RESULTS}, got {n}"
        ))),
    }
}

fn rejected(rejection: QueryRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

pub async fn welcome_handler() -> Json<MessageResponse> {
    Json(MessageResponse { message: "hi" })
}

pub async fn relevant_queries_handler(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<QueriesResponse>, ApiError> {
    let Query(params) = params.map_err(rejected)?;
    let query = require_query(params.query)?;

    let queries = state.query_expander.expand(&query).await?;
    Ok(Json(QueriesResponse { queries }))
}

pub async fn google_search_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<WebResultsResponse>, ApiError> {
    let Query(params) = params.map_err(rejected)?;
    let query = require_query(params.query)?;
    let count = result_count(params.count)?;

    let results = state.web_search.search(&query, count).await?;
    Ok(Json(ResultsResponse { results }))
}

pub async fn youtube_search_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<VideoResultsResponse>, ApiError> {
    let Query(params) = params.map_err(rejected)?;
    let query = require_query(params.query)?;
    let count = result_count(params.count)?;

    let results = state.video_search.search(&query, count).await?;
    Ok(Json(ResultsResponse { results }))
}

pub async fn linkedin_search_handler(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<JobsResponse>, ApiError> {
    let Query(params) = params.map_err(rejected)?;
    let query = require_query(params.query)?;

    // Run the scrape on its own task so a panic inside the browser driver
    // becomes a 500 instead of tearing down the connection.
    let source = state.job_source.clone();
    let jobs = tokio::spawn(async move { source.fetch_jobs(&query).await })
        .await
        .map_err(|e| ApiError::Internal(format!("job scrape task failed: {e}")))??;

    Ok(Json(JobsResponse { jobs }))
}
