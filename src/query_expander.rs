use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::data_models::QueryExpansion;
use crate::error::{UpstreamError, ensure_success};

const SERVICE: &str = "groq chat completions";

/// Number of alternative queries the model must produce.
pub const EXPANSION_SIZE: usize = 5;

const PROMPT_TEMPLATE: &str = r#"### USER SEARCH QUERY:
{search_query}

### INSTRUCTION:
Generate **5 relevant and diverse search queries** based on the given user query.
The queries should be **semantically similar** but **cover different aspects** of the topic.

### OUTPUT FORMAT:
Return only the queries in **valid JSON format** like this:
{"queries": [
    "Alternative search query 1",
    "Alternative search query 2",
    "Alternative search query 3",
    "Alternative search query 4",
    "Alternative search query 5"
]}
"#;

pub fn render_prompt(query: &str) -> String {
    PROMPT_TEMPLATE.replace("{search_query}", query.trim())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct QueryExpander {
    http: Client,
    completions_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl QueryExpander {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            completions_url: format!(
                "{}/chat/completions",
                config.groq_api_url.trim_end_matches('/')
            ),
            api_key: config.groq_api_key.clone(),
            model: config.groq_model.clone(),
            timeout: config.upstream_timeout,
        }
    }

    /// Asks the model for alternative phrasings of `query`.
    ///
    /// Sampling is deterministic (temperature 0) and JSON mode is requested,
    /// but the reply is still validated by [`parse_queries`] before use.
    pub async fn expand(&self, query: &str) -> Result<Vec<String>, UpstreamError> {
        let prompt = render_prompt(query);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, self.timeout, e))?;

        let response = ensure_success(SERVICE, response).await?;
        let raw = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, self.timeout, e))?;
        let body: ChatResponse = serde_json::from_str(&raw).map_err(|e| UpstreamError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| UpstreamError::ModelOutput("model returned no content".to_string()))?;

        let queries = parse_queries(&content).inspect_err(|e| {
            tracing::warn!(query, error = %e, "rejected model output");
        })?;
        tracing::debug!(query, ?queries, "query expansion completed");
        Ok(queries)
    }
}

/// Extracts the `{"queries": [...]}` object from free model text.
///
/// Every `{` is tried as the start of a JSON value; the first value that
/// satisfies the schema wins. Surrounding prose, including prose with its own
/// braces, is ignored.
pub fn parse_queries(text: &str) -> Result<Vec<String>, UpstreamError> {
    let mut first_error: Option<String> = None;

    for (offset, _) in text.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&text[offset..]).into_iter::<Value>();
        let candidate = match values.next() {
            Some(Ok(value)) => validate_expansion(value),
            Some(Err(e)) => Err(format!("malformed JSON: {e}")),
            None => continue,
        };
        match candidate {
            Ok(queries) => return Ok(queries),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    Err(UpstreamError::ModelOutput(
        first_error.unwrap_or_else(|| "no JSON object found in model response".to_string()),
    ))
}

fn validate_expansion(value: Value) -> Result<Vec<String>, String> {
    let expansion: QueryExpansion =
        serde_json::from_value(value).map_err(|e| format!("unexpected shape: {e}"))?;

    if expansion.queries.len() != EXPANSION_SIZE {
        return Err(format!(
            "expected {EXPANSION_SIZE} queries, got {}",
            expansion.queries.len()
        ));
    }
    if let Some(idx) = expansion.queries.iter().position(|q| q.trim().is_empty()) {
        return Err(format!("query {} is blank", idx + 1));
    }
    Ok(expansion.queries)
}
