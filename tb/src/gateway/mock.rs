//! Scripted gateway for unit tests

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use super::{GatewayError, ModelGateway};

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub user: String,
    pub system: String,
}

/// Returns canned responses in order and records every prompt it sees
pub struct MockGateway {
    responses: Vec<String>,
    call_count: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGateway {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        let responses: Vec<String> = responses.into_iter().map(Into::into).collect();
        debug!(response_count = %responses.len(), "MockGateway::new: called");
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn invoke(&self, user_prompt: &str, system_prompt: &str) -> Result<String, GatewayError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        debug!(%idx, "MockGateway::invoke: called");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                user: user_prompt.to_string(),
                system: system_prompt.to_string(),
            });
        }
        self.responses
            .get(idx)
            .cloned()
            .ok_or_else(|| GatewayError::InvalidResponse("No more mock responses".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_gateway_returns_responses_in_order() {
        let gw = MockGateway::new(["first", "second"]);
        assert_eq!(gw.invoke("a", "sys").await.unwrap(), "first");
        assert_eq!(gw.invoke("b", "").await.unwrap(), "second");
        assert!(gw.invoke("c", "").await.is_err());
        assert_eq!(gw.call_count(), 3);
        assert_eq!(
            gw.calls()[0],
            RecordedCall {
                user: "a".to_string(),
                system: "sys".to_string()
            }
        );
    }
}
