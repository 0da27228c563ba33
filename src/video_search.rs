use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::data_models::{MAX_RESULTS, VideoResult};
use crate::error::{UpstreamError, ensure_success};

const SERVICE: &str = "youtube search";

// Every field below is required: an item that lacks one fails the whole
// response as a schema mismatch instead of yielding a half-filled video.
#[derive(Debug, Deserialize)]
struct YoutubeSearchResponse {
    #[serde(default)]
    items: Vec<YoutubeItem>,
}

#[derive(Debug, Deserialize)]
struct YoutubeItem {
    id: YoutubeId,
    snippet: YoutubeSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YoutubeId {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YoutubeSnippet {
    title: String,
    channel_title: String,
    thumbnails: YoutubeThumbnails,
}

#[derive(Debug, Deserialize)]
struct YoutubeThumbnails {
    medium: YoutubeThumbnail,
}

#[derive(Debug, Deserialize)]
struct YoutubeThumbnail {
    url: String,
}

impl From<YoutubeItem> for VideoResult {
    fn from(item: YoutubeItem) -> Self {
        VideoResult {
            title: item.snippet.title,
            video_id: item.id.video_id,
            thumbnail: item.snippet.thumbnails.medium.url,
            channel_title: item.snippet.channel_title,
        }
    }
}

pub struct VideoSearchClient {
    http: Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl VideoSearchClient {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            endpoint: config.youtube_search_url.clone(),
            api_key: config.youtube_api_key.clone(),
            timeout: config.upstream_timeout,
        }
    }

    pub async fn search(&self, query: &str, count: u32) -> Result<Vec<VideoResult>, UpstreamError> {
        let count = count.clamp(1, MAX_RESULTS);
        let max_results = count.to_string();

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("key", self.api_key.as_str()),
                ("maxResults", max_results.as_str()),
                ("type", "video"),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, self.timeout, e))?;

        let response = ensure_success(SERVICE, response).await?;
        let raw = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, self.timeout, e))?;
        let body: YoutubeSearchResponse =
            serde_json::from_str(&raw).map_err(|e| UpstreamError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let videos: Vec<VideoResult> = body
            .items
            .into_iter()
            .take(count as usize)
            .map(VideoResult::from)
            .collect();

        tracing::debug!(query, returned = videos.len(), "video search completed");
        Ok(videos)
    }
}
