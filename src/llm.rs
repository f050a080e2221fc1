//! Language-Model Gateway
//!
//! The pipeline only needs "raw reply text for this question, or an error".
//! `LlmClient` gets it from an OpenAI-compatible chat-completions endpoint;
//! `OfflineGateway` stands in when no API key is configured.

use crate::config::AppConfig;
use crate::error::{Result, SoqlError};
use crate::schema_catalog::SchemaCatalog;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source of model replies for the pipeline
#[async_trait]
pub trait IntentGateway: Send + Sync {
    /// Gateway name for logs (e.g., "openai", "offline")
    fn name(&self) -> &'static str;

    /// Raw reply text for `query`. Any error puts the pipeline into keyword mode.
    async fn interpret(&self, query: &str) -> Result<String>;
}

/// Gateway that is never available
#[derive(Debug, Default, Clone)]
pub struct OfflineGateway;

#[async_trait]
impl IntentGateway for OfflineGateway {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn interpret(&self, _query: &str) -> Result<String> {
        Err(SoqlError::LlmUnavailable("no API key configured".to_string()))
    }
}

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
    system_prompt: String,
}

impl LlmClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
        catalog: &SchemaCatalog,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SoqlError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_retries: 0,
            system_prompt: build_system_prompt(catalog),
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn call_llm(&self, query: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.system_prompt},
                {"role": "user", "content": query}
            ],
            "temperature": 0.1,
            "max_tokens": 500
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SoqlError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SoqlError::Llm(format!("LLM API returned {}: {}", status, detail)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SoqlError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        extract_content(&response_json)
    }
}

#[async_trait]
impl IntentGateway for LlmClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn interpret(&self, query: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.call_llm(query).await {
                Ok(content) => {
                    debug!("LLM reply after {} attempt(s): {}", attempt + 1, content);
                    return Ok(content);
                }
                Err(e) if attempt < self.max_retries => {
                    warn!("LLM attempt {} failed, retrying: {}", attempt + 1, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Pick the gateway the configuration allows.
pub fn gateway_from_config(config: &AppConfig, catalog: &SchemaCatalog) -> Result<Arc<dyn IntentGateway>> {
    match &config.openai_api_key {
        Some(key) => {
            info!("Using OpenAI gateway (model {})", config.openai_model);
            let client = LlmClient::new(
                key.clone(),
                config.openai_model.clone(),
                config.openai_base_url.clone(),
                config.llm_timeout,
                catalog,
            )?
            .with_max_retries(config.llm_max_retries);
            Ok(Arc::new(client))
        }
        None => {
            warn!("OPENAI_API_KEY not set - using keyword matching only");
            Ok(Arc::new(OfflineGateway))
        }
    }
}

fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    response_json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SoqlError::Llm("No content in LLM response".to_string()))
}

fn build_system_prompt(catalog: &SchemaCatalog) -> String {
    let objects = catalog
        .object_names()
        .into_iter()
        .filter_map(|name| catalog.lookup(name))
        .map(|entry| {
            let fields: Vec<&str> = entry.valid_fields.iter().map(|f| f.as_str()).collect();
            format!("- {}: {}", entry.object_name, fields.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You translate business questions into Salesforce SOQL intents.
Available objects and fields:
{}

Return JSON only:
{{"object":"Account","fields":["Name","Industry"],"conditions":["Industry = 'Technology'"],"explanation":"one sentence"}}
Conditions are SOQL predicates without WHERE. Never include LIMIT or data-modifying statements."#,
        objects
    )
}
