//! Completion API tool — forwards a prompt to the configured upstream.

use crate::plugins::builtin::{classify_status, classify_transport};
use crate::plugins::ToolHandler;
use crate::registry::ResourceSet;
use crate::types::{CompletionConfig, Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// POSTs `{model, prompt, max_tokens, temperature}` to the completion
/// endpoint and returns the upstream JSON payload unchanged.
#[derive(Debug, Clone)]
pub struct CompletionHandler {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionHandler {
    pub fn new(client: reqwest::Client, config: CompletionConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ToolHandler for CompletionHandler {
    async fn execute(
        &self,
        params: &Map<String, Value>,
        _resources: &ResourceSet,
    ) -> Result<Value> {
        let prompt = params
            .get("prompt")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::schema("Missing required parameter: prompt"))?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::implementation("Completion API key not configured"))?;

        let model = params
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(&self.config.model);
        let max_tokens = params
            .get("max_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(u64::from(self.config.max_tokens));
        let temperature = params
            .get("temperature")
            .and_then(Value::as_f64)
            .unwrap_or(self.config.temperature);

        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport("completion", &e))?;

        let status = response.status();
        if let Some(err) = classify_status("completion", status) {
            return Err(err);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| classify_transport("completion", &e))
    }
}
