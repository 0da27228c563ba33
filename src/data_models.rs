use serde::{Deserialize, Serialize};

/// Placeholder for a job card without a `<time>` element.
pub const NOT_AVAILABLE: &str = "N/A";

/// Results returned when the caller does not ask for a count.
pub const DEFAULT_RESULTS: u32 = 5;
/// Upper bound both Google and YouTube accept for a single page.
pub const MAX_RESULTS: u32 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub title: String,
    pub video_id: String,
    pub thumbnail: String,
    pub channel_title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JobListing {
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_link: String,
    pub posted_time: String,
}

impl JobListing {
    pub fn new(
        title: String,
        company: String,
        location: String,
        job_link: String,
        posted_time: Option<String>,
    ) -> JobListing {
        JobListing {
            title,
            company,
            location,
            job_link,
            posted_time: posted_time.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

/// The object the language model is asked to emit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryExpansion {
    pub queries: Vec<String>,
}
