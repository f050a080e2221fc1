use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoqlError {
    #[error("unsupported object: {0}")]
    UnsupportedObject(String),

    #[error("{0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SoqlError {
    /// Short machine-readable name used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            SoqlError::UnsupportedObject(_) => "unsupported_object",
            SoqlError::Validation(_) => "validation",
            SoqlError::Llm(_) => "llm",
            SoqlError::LlmUnavailable(_) => "llm_unavailable",
            SoqlError::Config(_) => "config",
            SoqlError::InvalidRequest(_) => "invalid_request",
            SoqlError::Io(_) => "io",
            SoqlError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, SoqlError>;
