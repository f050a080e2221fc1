//! Runtime configuration read from the environment (and `.env` via dotenv).

use crate::error::{Result, SoqlError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// No key means the service runs in keyword-only mode
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub llm_timeout: Duration,
    pub llm_max_retries: u32,
    pub bind_addr: String,
    pub max_query_chars: usize,
    pub schema_catalog_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            llm_timeout: Duration::from_secs(30),
            llm_max_retries: 1,
            bind_addr: "0.0.0.0:8080".to_string(),
            max_query_chars: 500,
            schema_catalog_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: get("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.openai_base_url),
            llm_timeout: parse_opt::<u64>("LLM_TIMEOUT_SECS", get("LLM_TIMEOUT_SECS"))?
                .map(Duration::from_secs)
                .unwrap_or(defaults.llm_timeout),
            llm_max_retries: parse_opt("LLM_MAX_RETRIES", get("LLM_MAX_RETRIES"))?
                .unwrap_or(defaults.llm_max_retries),
            bind_addr: get("SERVER_BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_query_chars: parse_opt("MAX_QUERY_CHARS", get("MAX_QUERY_CHARS"))?
                .unwrap_or(defaults.max_query_chars),
            schema_catalog_path: get("SCHEMA_CATALOG_PATH").map(PathBuf::from),
        })
    }

    pub fn llm_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

fn parse_opt<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| SoqlError::Config(format!("{} must be a non-negative integer, got '{}'", key, v)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(!config.llm_enabled());
        assert_eq!(config.openai_model, "gpt-4");
        assert_eq!(config.llm_timeout, Duration::from_secs(30));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.max_query_chars, 500);
        assert!(config.schema_catalog_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:9000/v1/"),
            ("LLM_TIMEOUT_SECS", "5"),
            ("LLM_MAX_RETRIES", "0"),
            ("MAX_QUERY_CHARS", "120"),
            ("SCHEMA_CATALOG_PATH", "config/catalog.json"),
        ])
        .unwrap();
        assert!(config.llm_enabled());
        assert_eq!(config.openai_base_url, "http://localhost:9000/v1");
        assert_eq!(config.llm_timeout, Duration::from_secs(5));
        assert_eq!(config.llm_max_retries, 0);
        assert_eq!(config.max_query_chars, 120);
        assert_eq!(config.schema_catalog_path, Some(PathBuf::from("config/catalog.json")));
    }

    #[test]
    fn test_blank_key_is_unset() {
        let config = config_from(&[("OPENAI_API_KEY", "   ")]).unwrap();
        assert!(!config.llm_enabled());
    }

    #[test]
    fn test_malformed_number() {
        let err = config_from(&[("LLM_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, SoqlError::Config(ref msg) if msg.contains("LLM_TIMEOUT_SECS")));
    }
}
