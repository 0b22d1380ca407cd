//! Model gateway
//!
//! The engine only needs one capability from a language model: send a user
//! prompt with an optional system prompt, get the full raw text back.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

mod command;
mod error;
#[cfg(test)]
pub mod mock;
mod openai;

pub use command::CommandGateway;
pub use error::GatewayError;
pub use openai::OpenAiGateway;

use crate::config::GatewayConfig;

/// Stateless model access, each call is an independent conversation
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Run one prompt pair and return the raw response text
    ///
    /// An empty `system_prompt` means no system instruction.
    async fn invoke(&self, user_prompt: &str, system_prompt: &str) -> Result<String, GatewayError>;
}

/// Create a gateway for the provider named in config
pub fn create_gateway(config: &GatewayConfig) -> Result<Arc<dyn ModelGateway>, GatewayError> {
    debug!(provider = %config.provider, "create_gateway: called");
    match config.provider.as_str() {
        "command" => Ok(Arc::new(CommandGateway::from_config(&config.command)?)),
        "openai" => Ok(Arc::new(OpenAiGateway::from_config(&config.openai)?)),
        other => Err(GatewayError::Config(format!(
            "Unknown gateway provider: '{}'. Supported: command, openai",
            other
        ))),
    }
}
