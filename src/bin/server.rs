//! HTTP Server for the SOQL translator
//! Simple HTTP server using tokio and basic HTTP handling

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use soql_copilot::api::{self, content_length, ApiResponse, AppState, HttpRequest};
use soql_copilot::config::AppConfig;

const MAX_REQUEST_BYTES: usize = 1_000_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let state = Arc::new(AppState::from_config(&config)?);

    if state.llm_enabled {
        info!("OpenAI API key found - AI-assisted translation enabled");
    } else {
        warn!("OpenAI API key not found - using keyword matching only");
    }

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on {}", config.bind_addr);

    loop {
        let (stream, addr) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let request_id = uuid::Uuid::new_v4();
            info!("[{}] New connection from {}", request_id, addr);
            if let Err(e) = handle_connection(stream, state).await {
                error!("[{}] Error handling connection from {}: {}", request_id, addr, e);
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) -> std::io::Result<()> {
    let read_result = timeout(Duration::from_secs(5), read_request(&mut stream)).await;

    let response = match read_result {
        Err(_) => {
            warn!("Request read timeout");
            ApiResponse::error(408, "timeout", "request timeout")
        }
        Ok(Err(e)) => return Err(e),
        Ok(Ok(None)) => ApiResponse::error(413, "invalid_request", "request too large"),
        Ok(Ok(Some(buffer))) if buffer.is_empty() => return Ok(()),
        Ok(Ok(Some(buffer))) => match String::from_utf8(buffer) {
            Ok(raw) => match HttpRequest::parse(&raw) {
                Some(request) => api::handle(&state, &request).await,
                None => ApiResponse::error(400, "invalid_request", "malformed request line"),
            },
            Err(_) => ApiResponse::error(400, "invalid_request", "request is not valid UTF-8"),
        },
    };

    stream.write_all(response.to_http().as_bytes()).await?;
    stream.flush().await
}

/// Read headers and, when announced, the full body. `None` means the request
/// exceeded `MAX_REQUEST_BYTES`.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];

    loop {
        let n = stream.read(&mut temp_buf).await?;
        if n == 0 {
            break; // EOF
        }
        buffer.extend_from_slice(&temp_buf[..n]);

        match read_progress(&buffer) {
            ReadProgress::Incomplete => {}
            ReadProgress::Complete => break,
            ReadProgress::TooLarge => return Ok(None),
        }
    }

    Ok(Some(buffer))
}

#[derive(Debug, PartialEq, Eq)]
enum ReadProgress {
    Incomplete,
    Complete,
    TooLarge,
}

/// Whether `buffer` holds a full request. An announced body that would take
/// the request past `MAX_REQUEST_BYTES` is rejected before it is read.
fn read_progress(buffer: &[u8]) -> ReadProgress {
    if buffer.len() > MAX_REQUEST_BYTES {
        return ReadProgress::TooLarge;
    }

    let Some(headers_end) = find_headers_end(buffer) else {
        return ReadProgress::Incomplete;
    };
    let head = String::from_utf8_lossy(&buffer[..headers_end]);
    let expected = content_length(&head).unwrap_or(0);

    match (headers_end + 4).checked_add(expected) {
        Some(total) if total > MAX_REQUEST_BYTES => ReadProgress::TooLarge,
        None => ReadProgress::TooLarge,
        Some(total) if buffer.len() >= total => ReadProgress::Complete,
        Some(_) => ReadProgress::Incomplete,
    }
}

fn find_headers_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_progress_waits_for_body() {
        let head = b"POST /api/generate-soql HTTP/1.1\r\nContent-Length: 11\r\n\r\n";
        assert_eq!(read_progress(b"GET /health HTTP/1.1\r\n"), ReadProgress::Incomplete);
        assert_eq!(read_progress(head), ReadProgress::Incomplete);

        let mut full = head.to_vec();
        full.extend_from_slice(b"{\"query\":1}");
        assert_eq!(read_progress(&full[..full.len() - 2]), ReadProgress::Incomplete);
        assert_eq!(read_progress(&full), ReadProgress::Complete);
        assert_eq!(read_progress(b"GET /health HTTP/1.1\r\n\r\n"), ReadProgress::Complete);
    }

    #[test]
    fn test_read_progress_rejects_oversized_content_length() {
        let huge = format!(
            "POST /api/generate-soql HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            usize::MAX
        );
        assert_eq!(read_progress(huge.as_bytes()), ReadProgress::TooLarge);

        let over = format!(
            "POST /api/generate-soql HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            MAX_REQUEST_BYTES
        );
        assert_eq!(read_progress(over.as_bytes()), ReadProgress::TooLarge);
    }
}
