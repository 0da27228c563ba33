pub mod api;
pub mod config;
pub mod data_models;
pub mod error;
pub mod job_scraper;
pub mod query_expander;
pub mod video_search;
pub mod web_search;
