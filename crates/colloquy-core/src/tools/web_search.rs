//! Web search tool using the Tavily API.

use serde_json::{json, Map, Value};
use tracing::{error, info};

use super::{BoxFuture, ParamKind, ParamSpec, Tool, ToolOutput};
use crate::error::ToolError;

const SEARCH_URL: &str = "https://api.tavily.com/search";

pub struct WebSearch {
    api_key: Option<String>,
    client: reqwest::Client,
}

impl WebSearch {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns result titles, URLs, \
         and content snippets."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("query", ParamKind::String, "Search query"),
            ParamSpec::optional(
                "max_results",
                ParamKind::Integer,
                "Maximum number of results to return",
                json!(5),
            ),
        ]
    }

    fn requires_approval(&self) -> bool {
        true
    }

    fn execute(&self, args: Map<String, Value>) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let query = args["query"].as_str().unwrap_or("");
            let max_results = args["max_results"].as_f64().unwrap_or(5.0) as u64;
            info!(query, max_results, "Web search");

            let Some(api_key) = self.api_key.as_deref() else {
                error!("Tavily API key not configured");
                return Ok(ToolOutput::error(
                    "api_key_missing",
                    "Web search API key not configured. Set TAVILY_API_KEY",
                ));
            };

            let body = json!({
                "api_key": api_key,
                "query": query,
                "max_results": max_results,
                "search_depth": "basic",
            });

            let response = match self.client.post(SEARCH_URL).json(&body).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    error!(error = %e, "Search request failed");
                    return Ok(ToolOutput::error("search_failed", e.to_string()));
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                return Ok(ToolOutput::error(
                    "search_failed",
                    format!("Search API returned {}", status),
                ));
            }

            let data: Value = match response.json().await {
                Ok(data) => data,
                Err(e) => return Ok(ToolOutput::error("invalid_response", e.to_string())),
            };

            let results: Vec<Value> = data["results"]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .map(|item| {
                            json!({
                                "title": item["title"],
                                "url": item["url"],
                                "content": item["content"],
                                "score": item["score"],
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            info!(count = results.len(), "Search results received");
            Ok(ToolOutput::success(json!({
                "query": query,
                "count": results.len(),
                "results": results,
            })))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_structured_error() {
        let tool = WebSearch::new(None);
        let mut args = Map::new();
        args.insert("query".to_string(), json!("latest AI news"));
        args.insert("max_results".to_string(), json!(3));

        let out = tool.execute(args).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.error_type.as_deref(), Some("api_key_missing"));
    }
}
