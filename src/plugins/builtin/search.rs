//! Search API tool — queries the configured search endpoint.

use crate::plugins::builtin::{classify_status, classify_transport};
use crate::plugins::ToolHandler;
use crate::registry::ResourceSet;
use crate::types::{Error, Result, SearchConfig};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// GETs `?q=<query>&count=<count>` from the search endpoint and returns the
/// upstream JSON payload unchanged.
#[derive(Debug, Clone)]
pub struct SearchHandler {
    client: reqwest::Client,
    config: SearchConfig,
}

impl SearchHandler {
    pub fn new(client: reqwest::Client, config: SearchConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ToolHandler for SearchHandler {
    async fn execute(
        &self,
        params: &Map<String, Value>,
        _resources: &ResourceSet,
    ) -> Result<Value> {
        let query = params
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::schema("Missing required parameter: query"))?;
        let count = params
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or(u64::from(self.config.default_results));

        let mut request = self
            .client
            .get(&self.config.base_url)
            .query(&[("q", query), ("count", &count.to_string())]);
        if let Some(key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport("search", &e))?;

        let status = response.status();
        if let Some(err) = classify_status("search", status) {
            return Err(err);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| classify_transport("search", &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_query_is_schema_error() {
        let handler = SearchHandler::new(reqwest::Client::new(), SearchConfig::default());
        let err = handler
            .execute(&Map::new(), &ResourceSet::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "SCHEMA_ERROR");
    }
}
