use serde_json::json;
use soql_copilot::api::{handle, ApiResponse, AppState, HttpRequest};
use soql_copilot::config::AppConfig;

fn offline_state() -> AppState {
    // default config has no API key, so the offline gateway is used
    AppState::from_config(&AppConfig::default()).expect("build state")
}

fn request(method: &str, target: &str, body: &str) -> HttpRequest {
    let raw = format!(
        "{} {} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\r\n{}",
        method,
        target,
        body.len(),
        body
    );
    HttpRequest::parse(&raw).expect("parse request")
}

async fn call(method: &str, target: &str, body: &str) -> ApiResponse {
    handle(&offline_state(), &request(method, target, body)).await
}

#[tokio::test]
async fn test_health() {
    let response = call("GET", "/health", "").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["llm_enabled"], false);
}

#[tokio::test]
async fn test_generate_soql() {
    let response = call(
        "POST",
        "/api/generate-soql",
        r#"{"query":"Show me accounts with high revenue"}"#,
    )
    .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["object_name"], "Account");
    assert_eq!(response.body["source"], "keyword_fallback");
    assert_eq!(
        response.body["query_text"],
        "SELECT Id, Name, Industry, Type, CreatedDate FROM Account WHERE AnnualRevenue > 1000000 AND IsDeleted = false ORDER BY Name LIMIT 1000"
    );
}

#[tokio::test]
async fn test_generate_soql_rejects_bad_input() {
    let response = call("POST", "/api/generate-soql", r#"{"query":"   "}"#).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body["success"], false);

    let response = call("POST", "/api/generate-soql", "not json").await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body["kind"], "invalid_request");

    let long_query = "a".repeat(501);
    let response = call("POST", "/api/generate-soql", &json!({"query": long_query}).to_string()).await;
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_validate_soql() {
    let response = call(
        "POST",
        "/api/validate-soql",
        r#"{"soql":"SELECT Id FROM Account LIMIT 5000"}"#,
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"valid": false, "reason": "limit exceeds maximum"}));

    let response = call(
        "POST",
        "/api/validate-soql",
        r#"{"soql":"SELECT Id FROM Account LIMIT 1000"}"#,
    )
    .await;
    assert_eq!(response.body, json!({"valid": true}));
}

#[tokio::test]
async fn test_objects() {
    let response = call("GET", "/api/objects", "").await;
    assert_eq!(response.status, 200);
    let names: Vec<&str> = response.body["objects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Account", "Case", "Contact", "Lead", "Opportunity"]);

    let response = call("GET", "/api/objects/Opportunity", "").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["default_sort"], json!(["CloseDate DESC"]));

    let response = call("GET", "/api/objects/Widget", "").await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_lexicon_resolve() {
    let response = call("GET", "/api/lexicon/resolve?phrase=Deals", "").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["token"], "Opportunity");
    assert_eq!(response.body["category"], "object");

    let response = call("GET", "/api/lexicon/resolve?phrase=frobnicate", "").await;
    assert_eq!(response.body["token"], "frobnicate");
    assert!(response.body["category"].is_null());

    let response = call("GET", "/api/lexicon/resolve", "").await;
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    assert_eq!(call("GET", "/nope", "").await.status, 404);
    assert_eq!(call("GET", "/api/generate-soql", "").await.status, 405);
}
