//! HTTP API routing
//!
//! Request parsing and route handling for the `server` binary, kept free of
//! sockets so handlers can be exercised directly.

use crate::config::AppConfig;
use crate::error::{Result, SoqlError};
use crate::lexicon::BusinessLexicon;
use crate::llm::gateway_from_config;
use crate::pipeline::QueryPipeline;
use crate::schema_catalog::SchemaCatalog;
use crate::validation::ValidationOutcome;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: QueryPipeline,
    pub max_query_chars: usize,
    pub llm_enabled: bool,
}

impl AppState {
    pub fn new(pipeline: QueryPipeline, max_query_chars: usize, llm_enabled: bool) -> Self {
        Self {
            pipeline,
            max_query_chars,
            llm_enabled,
        }
    }

    /// Catalog, lexicon and gateway as the configuration dictates.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let catalog = match &config.schema_catalog_path {
            Some(path) => SchemaCatalog::from_json_file(path)?,
            None => SchemaCatalog::standard(),
        };
        let gateway = gateway_from_config(config, &catalog)?;
        let pipeline = QueryPipeline::new(Arc::new(catalog), Arc::new(BusinessLexicon::standard()), gateway);
        Ok(Self::new(pipeline, config.max_query_chars, config.llm_enabled()))
    }
}

/// Minimal parsed HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
}

impl HttpRequest {
    /// Parse a raw HTTP/1.1 request. `None` when the request line is unusable.
    pub fn parse(raw: &str) -> Option<Self> {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
        let mut parts = head.lines().next()?.split_whitespace();
        let method = parts.next()?.to_uppercase();
        let target = parts.next()?;

        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q.to_string())),
            None => (target, None),
        };
        let mut path = path.trim_end_matches('/').to_string();
        if path.is_empty() {
            path = "/".to_string();
        }

        Some(Self {
            method,
            path,
            query,
            body: body.to_string(),
        })
    }

    /// First value of a query-string parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query.as_deref()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key != name {
                return None;
            }
            let value = value.replace('+', " ");
            Some(percent_decode_str(&value).decode_utf8_lossy().into_owned())
        })
    }
}

/// Content-Length of a request head, if present.
pub fn content_length(head: &str) -> Option<usize> {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({"success": false, "kind": kind, "error": message.into()}),
        }
    }

    fn from_error(err: &SoqlError) -> Self {
        let status = match err {
            SoqlError::UnsupportedObject(_) | SoqlError::Validation(_) => 422,
            SoqlError::InvalidRequest(_) => 400,
            _ => 500,
        };
        Self::error(status, err.kind(), err.to_string())
    }

    pub fn status_text(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Payload Too Large",
            422 => "Unprocessable Entity",
            _ => "Internal Server Error",
        }
    }

    pub fn to_http(&self) -> String {
        let body = self.body.to_string();
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {}",
            self.status,
            self.status_text(),
            body.len(),
            body
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    query: String,
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    soql: String,
}

/// Route a parsed request.
pub async fn handle(state: &AppState, request: &HttpRequest) -> ApiResponse {
    debug!("Request: {} {}", request.method, request.path);

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => ApiResponse::ok(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "llm_enabled": state.llm_enabled,
        })),
        ("POST", "/api/generate-soql") => generate(state, &request.body).await,
        ("POST", "/api/validate-soql") => validate(state, &request.body),
        ("GET", "/api/objects") => list_objects(state),
        ("GET", path) if path.starts_with("/api/objects/") => {
            let name = path.trim_start_matches("/api/objects/");
            let name = percent_decode_str(name).decode_utf8_lossy();
            match state.pipeline.catalog().lookup(&name) {
                Some(entry) => ApiResponse::ok(json!(entry)),
                None => ApiResponse::error(404, "unsupported_object", format!("unsupported object: {}", name)),
            }
        }
        ("GET", "/api/lexicon/resolve") => match request.query_param("phrase") {
            Some(phrase) if !phrase.trim().is_empty() => {
                let lexicon = state.pipeline.lexicon();
                let category = lexicon.classify(&phrase).map(|(c, _)| c);
                ApiResponse::ok(json!({
                    "phrase": phrase,
                    "token": lexicon.resolve(&phrase),
                    "category": category,
                }))
            }
            _ => ApiResponse::error(400, "invalid_request", "query parameter 'phrase' is required"),
        },
        (_, "/health")
        | (_, "/api/generate-soql")
        | (_, "/api/validate-soql")
        | (_, "/api/objects")
        | (_, "/api/lexicon/resolve") => ApiResponse::error(405, "method_not_allowed", "method not allowed"),
        _ => ApiResponse::error(404, "not_found", format!("no route for {}", request.path)),
    }
}

async fn generate(state: &AppState, body: &str) -> ApiResponse {
    let req: GenerateRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => return ApiResponse::error(400, "invalid_request", format!("invalid JSON body: {}", e)),
    };

    let query = req.query.trim();
    if query.is_empty() {
        return ApiResponse::error(400, "invalid_request", "query must not be empty");
    }
    if query.chars().count() > state.max_query_chars {
        return ApiResponse::error(
            400,
            "invalid_request",
            format!("query exceeds {} characters", state.max_query_chars),
        );
    }

    match state.pipeline.process(query).await {
        Ok(result) => {
            let mut body = json!(result);
            body["success"] = json!(true);
            ApiResponse::ok(body)
        }
        Err(e) => {
            error!("Failed to generate SOQL for '{}': {}", query, e);
            ApiResponse::from_error(&e)
        }
    }
}

fn validate(state: &AppState, body: &str) -> ApiResponse {
    let req: ValidateRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => return ApiResponse::error(400, "invalid_request", format!("invalid JSON body: {}", e)),
    };

    match state.pipeline.validator().validate(&req.soql) {
        ValidationOutcome::Valid => ApiResponse::ok(json!({"valid": true})),
        ValidationOutcome::Invalid { reason } => ApiResponse::ok(json!({"valid": false, "reason": reason})),
    }
}

fn list_objects(state: &AppState) -> ApiResponse {
    let catalog = state.pipeline.catalog();
    let objects: Vec<Value> = catalog
        .object_names()
        .into_iter()
        .filter_map(|name| catalog.lookup(name))
        .map(|entry| json!({"name": entry.object_name, "default_fields": entry.default_fields}))
        .collect();
    ApiResponse::ok(json!({"objects": objects}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let raw = "POST /api/generate-soql/ HTTP/1.1\r\nHost: x\r\nContent-Length: 17\r\n\r\n{\"query\":\"leads\"}";
        let req = HttpRequest::parse(raw).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/api/generate-soql");
        assert_eq!(req.body, "{\"query\":\"leads\"}");
        assert_eq!(content_length(raw), Some(17));
    }

    #[test]
    fn test_parse_request_rejects_garbage() {
        assert_eq!(HttpRequest::parse(""), None);
        assert_eq!(HttpRequest::parse("GET"), None);
    }

    #[test]
    fn test_query_param_decoding() {
        let req = HttpRequest::parse("GET /api/lexicon/resolve?x=1&phrase=high%20priority HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.path, "/api/lexicon/resolve");
        assert_eq!(req.query_param("phrase").as_deref(), Some("high priority"));
        assert_eq!(req.query_param("missing"), None);

        let req = HttpRequest::parse("GET /?phrase=in+progress HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.path, "/");
        assert_eq!(req.query_param("phrase").as_deref(), Some("in progress"));
    }

    #[test]
    fn test_response_rendering() {
        let response = ApiResponse::error(422, "validation", "limit exceeds maximum");
        let http = response.to_http();
        assert!(http.starts_with("HTTP/1.1 422 Unprocessable Entity\r\n"));
        let body = response.body.to_string();
        assert!(http.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert!(http.ends_with(&body));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApiResponse::from_error(&SoqlError::UnsupportedObject("X".into())).status, 422);
        assert_eq!(ApiResponse::from_error(&SoqlError::Validation("bad".into())).status, 422);
        assert_eq!(ApiResponse::from_error(&SoqlError::InvalidRequest("bad".into())).status, 400);
        assert_eq!(ApiResponse::from_error(&SoqlError::Llm("down".into())).status, 500);
    }
}
