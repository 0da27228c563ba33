use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "https://ai-powered-search-iota.vercel.app",
];
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const DEFAULT_YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LINKEDIN_SEARCH_URL: &str = "https://www.linkedin.com/jobs/search";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime configuration, built once at startup and handed to each service.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub google_cse_id: String,
    pub youtube_api_key: String,
    pub groq_api_key: String,
    pub groq_model: String,

    pub google_search_url: String,
    pub youtube_search_url: String,
    pub groq_api_url: String,
    pub linkedin_search_url: String,

    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,

    pub upstream_timeout: Duration,
    pub scrape_timeout: Duration,
    pub scrape_render_wait: Duration,
    pub scrape_headless: bool,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let cors_origins = match get("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Config {
            google_api_key: require("GOOGLE_API_KEY")?,
            google_cse_id: require("GOOGLE_CSE_ID")?,
            youtube_api_key: require("YOUTUBE_API_KEY")?,
            groq_api_key: require("GROQ_API_KEY")?,
            groq_model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),

            google_search_url: get("GOOGLE_SEARCH_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_SEARCH_URL.to_string()),
            youtube_search_url: get("YOUTUBE_SEARCH_URL")
                .unwrap_or_else(|| DEFAULT_YOUTUBE_SEARCH_URL.to_string()),
            groq_api_url: get("GROQ_API_URL").unwrap_or_else(|| DEFAULT_GROQ_API_URL.to_string()),
            linkedin_search_url: get("LINKEDIN_SEARCH_URL")
                .unwrap_or_else(|| DEFAULT_LINKEDIN_SEARCH_URL.to_string()),

            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), || {
                SocketAddr::from(([127, 0, 0, 1], 5000))
            })?,
            cors_origins,

            upstream_timeout: Duration::from_secs(parse_or(
                "UPSTREAM_TIMEOUT_SECS",
                get("UPSTREAM_TIMEOUT_SECS"),
                || 15,
            )?),
            scrape_timeout: Duration::from_secs(parse_or(
                "SCRAPE_TIMEOUT_SECS",
                get("SCRAPE_TIMEOUT_SECS"),
                || 45,
            )?),
            scrape_render_wait: Duration::from_secs(parse_or(
                "SCRAPE_RENDER_WAIT_SECS",
                get("SCRAPE_RENDER_WAIT_SECS"),
                || 5,
            )?),
            scrape_headless: parse_or("SCRAPE_HEADLESS", get("SCRAPE_HEADLESS"), || true)?,
        })
    }
}

fn parse_or<T, D>(key: &'static str, raw: Option<String>, default: D) -> Result<T, ConfigError>
where
    T: FromStr,
    D: FnOnce() -> T,
{
    match raw {
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|_| ConfigError::Invalid { key, value })
        }
        None => Ok(default()),
    }
}
