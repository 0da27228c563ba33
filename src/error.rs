use std::time::Duration;

use thiserror::Error;

/// Failure of a call to a third-party service.
///
/// Services return `Result<Vec<T>, UpstreamError>`: an empty vec means the
/// upstream answered with zero results, an error means it could not be asked.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} response did not match the expected schema: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{service} did not answer within {after:?}")]
    Timeout {
        service: &'static str,
        after: Duration,
    },

    #[error("browser session failed: {0}")]
    Browser(String),

    #[error("could not parse model response: {0}")]
    ModelOutput(String),
}

impl UpstreamError {
    /// Maps a reqwest error, folding client-side timeouts into `Timeout`.
    pub fn from_reqwest(service: &'static str, timeout: Duration, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            UpstreamError::Timeout {
                service,
                after: timeout,
            }
        } else {
            UpstreamError::Request { service, source }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout { .. })
    }
}

/// Turns a non-2xx response into `UpstreamError::Status`, keeping a short body excerpt.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(300).collect();
    Err(UpstreamError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}
