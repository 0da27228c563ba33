use axum::{Router, http::HeaderValue, routing::get};
use reqwest::Client;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::job_scraper::{JobSource, LinkedInScraper};
use crate::query_expander::QueryExpander;
use crate::video_search::VideoSearchClient;
use crate::web_search::WebSearchClient;

pub mod handlers;
pub mod models;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Services shared by every handler. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub web_search: Arc<WebSearchClient>,
    pub video_search: Arc<VideoSearchClient>,
    pub query_expander: Arc<QueryExpander>,
    pub job_source: Arc<dyn JobSource>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.upstream_timeout)
            .build()?;

        Ok(Self::with_job_source(
            http,
            config,
            Arc::new(LinkedInScraper::new(config)),
        ))
    }

    /// Same as [`AppState::from_config`] but with a caller-supplied job source.
    pub fn with_job_source(http: Client, config: &Config, job_source: Arc<dyn JobSource>) -> Self {
        Self {
            web_search: Arc::new(WebSearchClient::new(http.clone(), config)),
            video_search: Arc::new(VideoSearchClient::new(http.clone(), config)),
            query_expander: Arc::new(QueryExpander::new(http, config)),
            job_source,
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // Wildcards are not allowed together with credentials, so methods and
    // headers mirror whatever the preflight asks for.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::welcome_handler))
        .route("/relevant_queries/", get(handlers::relevant_queries_handler))
        .route("/google_search/", get(handlers::google_search_handler))
        .route("/youtube_search/", get(handlers::youtube_search_handler))
        .route("/linkedin_search/", get(handlers::linkedin_search_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}
