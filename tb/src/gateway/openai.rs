//! OpenAI-compatible Chat Completions gateway
//!
//! Works against api.openai.com as well as local servers that speak the same
//! protocol (llama.cpp `llama-server`, vLLM, Ollama).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{GatewayError, ModelGateway};
use crate::config::OpenAiConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Wait suggested by a 429 without a usable `retry-after` header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504)
}

/// What `invoke` does with a response status on a given attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusAction {
    Success,
    RateLimited,
    Retry,
    Fail,
}

fn classify_status(status: u16, attempt: u32) -> StatusAction {
    match status {
        200..=299 => StatusAction::Success,
        429 => StatusAction::RateLimited,
        s if is_retryable_status(s) && attempt < MAX_RETRIES => StatusAction::Retry,
        _ => StatusAction::Fail,
    }
}

/// Delay before retry `attempt` (1-based), doubling each time
fn backoff_ms(attempt: u32) -> u64 {
    INITIAL_BACKOFF_MS * 2u64.pow(attempt.saturating_sub(1))
}

/// Seconds from a `retry-after` header, falling back to a minute
fn retry_after(header: Option<&str>) -> Duration {
    let secs = header
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    Duration::from_secs(secs)
}

/// OpenAI API gateway
pub struct OpenAiGateway {
    model: String,
    api_key: Option<String>,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl OpenAiGateway {
    /// Create a new gateway from configuration
    ///
    /// A missing API key is allowed; local servers usually do not check one.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, GatewayError> {
        debug!(model = %config.model, base_url = %config.base_url, "OpenAiGateway::from_config: called");
        let api_key = match config.get_api_key() {
            Ok(key) => Some(key),
            Err(e) => {
                debug!(error = %e, "OpenAiGateway::from_config: no API key");
                None
            }
        };

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(GatewayError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, user_prompt: &str, system_prompt: &str) -> serde_json::Value {
        let mut messages = Vec::new();
        if !system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system_prompt,
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": user_prompt,
        }));

        // GPT-5.x and o1/o3 models use max_completion_tokens instead of max_tokens
        let uses_completion_tokens =
            self.model.starts_with("gpt-5") || self.model.starts_with("o1") || self.model.starts_with("o3");

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if uses_completion_tokens {
            body["max_completion_tokens"] = serde_json::json!(self.max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(self.max_tokens);
        }

        body
    }

    fn parse_response(api_response: OpenAiResponse) -> Result<String, GatewayError> {
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GatewayError::InvalidResponse("response has no message content".to_string()))
    }
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn invoke(&self, user_prompt: &str, system_prompt: &str) -> Result<String, GatewayError> {
        debug!(%self.model, "OpenAiGateway::invoke: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(user_prompt, system_prompt);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = backoff_ms(attempt);
                warn!(attempt, backoff_ms = backoff, "invoke: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let mut request = self.http.post(url.clone()).header("content-type", "application/json");
            if let Some(key) = &self.api_key {
                request = request.header("Authorization", format!("Bearer {}", key));
            }

            let response = match request.json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "invoke: network error");
                    last_error = Some(GatewayError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            match classify_status(status, attempt) {
                StatusAction::Success => {
                    let api_response: OpenAiResponse = response.json().await?;
                    return Self::parse_response(api_response);
                }
                StatusAction::RateLimited => {
                    debug!("invoke: rate limited (429)");
                    let header = response.headers().get("retry-after").and_then(|v| v.to_str().ok());
                    return Err(GatewayError::RateLimited {
                        retry_after: retry_after(header),
                    });
                }
                StatusAction::Retry => {
                    let text = response.text().await.unwrap_or_default();
                    debug!(attempt, status, "invoke: retryable error");
                    last_error = Some(GatewayError::ApiError { status, message: text });
                }
                StatusAction::Fail => {
                    debug!(%status, "invoke: API error");
                    let text = response.text().await.unwrap_or_default();
                    return Err(GatewayError::ApiError { status, message: text });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GatewayError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(model: &str) -> OpenAiGateway {
        OpenAiGateway {
            model: model.to_string(),
            api_key: Some("test-key".to_string()),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            max_tokens: 2048,
        }
    }

    #[test]
    fn test_build_request_body_with_system() {
        let body = gateway("gpt-4o").build_request_body("What is 2+2?", "Be brief.");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Be brief.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "What is 2+2?");
    }

    #[test]
    fn test_build_request_body_omits_empty_system() {
        let body = gateway("gpt-4o").build_request_body("Pick one", "");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn test_completion_tokens_models() {
        let body = gateway("o3-mini").build_request_body("q", "");
        assert_eq!(body["max_completion_tokens"], 2048);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_response() {
        let ok: OpenAiResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "(2)"}}]}"#).unwrap();
        assert_eq!(OpenAiGateway::parse_response(ok).unwrap(), "(2)");

        let empty: OpenAiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            OpenAiGateway::parse_response(empty),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(200, 0), StatusAction::Success);
        assert_eq!(classify_status(429, 0), StatusAction::RateLimited);
        assert_eq!(classify_status(429, MAX_RETRIES), StatusAction::RateLimited);
        assert_eq!(classify_status(503, 0), StatusAction::Retry);
        assert_eq!(classify_status(408, MAX_RETRIES - 1), StatusAction::Retry);
        // Out of attempts, a transient status is reported as is
        assert_eq!(classify_status(503, MAX_RETRIES), StatusAction::Fail);
        assert_eq!(classify_status(400, 0), StatusAction::Fail);
        assert_eq!(classify_status(401, 0), StatusAction::Fail);
    }

    #[test]
    fn test_backoff_doubles() {
        let delays: Vec<_> = (1..=MAX_RETRIES).map(backoff_ms).collect();
        assert_eq!(delays, vec![1000, 2000, 4000]);
    }

    #[test]
    fn test_retry_after_header() {
        assert_eq!(retry_after(Some("7")), Duration::from_secs(7));
        assert_eq!(retry_after(Some(" 12 ")), Duration::from_secs(12));
        assert_eq!(retry_after(Some("Wed, 21 Oct 2026 07:28:00 GMT")), Duration::from_secs(60));
        assert_eq!(retry_after(None), Duration::from_secs(60));
    }

    mod http {
        use super::*;
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};

        const COMPLETION: &str = r#"{"choices": [{"message": {"content": "(1)"}}]}"#;

        /// Canned reply: status line, extra header lines, body
        struct Reply(&'static str, &'static str, &'static str);

        async fn read_request(stream: &mut TcpStream) {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                let Some(head_end) = text.find("\r\n\r\n") else {
                    continue;
                };
                let length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + length {
                    return;
                }
            }
        }

        /// Serve one canned reply per connection, counting requests
        async fn serve(replies: Vec<Reply>) -> (String, Arc<AtomicUsize>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = hits.clone();
            tokio::spawn(async move {
                for Reply(status, headers, body) in replies {
                    let (mut stream, _) = listener.accept().await.unwrap();
                    read_request(&mut stream).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    let response = format!(
                        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n{}\r\n{}",
                        status,
                        body.len(),
                        headers,
                        body
                    );
                    stream.write_all(response.as_bytes()).await.unwrap();
                    stream.shutdown().await.unwrap();
                }
            });
            (format!("http://{}", addr), hits)
        }

        fn local_gateway(base_url: String) -> OpenAiGateway {
            OpenAiGateway {
                base_url,
                api_key: None,
                http: Client::builder().no_proxy().build().unwrap(),
                ..gateway("local-model")
            }
        }

        #[tokio::test]
        async fn test_rate_limited_uses_retry_after() {
            let (url, hits) = serve(vec![Reply("429 Too Many Requests", "retry-after: 7\r\n", "{}")]).await;
            let err = local_gateway(url).invoke("q", "").await.unwrap_err();
            assert!(matches!(err, GatewayError::RateLimited { retry_after } if retry_after == Duration::from_secs(7)));
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_client_error_is_not_retried() {
            let (url, hits) = serve(vec![Reply("400 Bad Request", "", r#"{"error": "bad model"}"#)]).await;
            let err = local_gateway(url).invoke("q", "").await.unwrap_err();
            assert!(matches!(err, GatewayError::ApiError { status: 400, ref message } if message.contains("bad model")));
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_transient_error_is_retried() {
            let (url, hits) = serve(vec![
                Reply("503 Service Unavailable", "", "{}"),
                Reply("200 OK", "", COMPLETION),
            ])
            .await;
            let content = local_gateway(url).invoke("q", "").await.unwrap();
            assert_eq!(content, "(1)");
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }
    }
}
