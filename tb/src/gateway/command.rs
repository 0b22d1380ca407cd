//! Local inference binary gateway (llama.cpp `llama-cli` and friends)

use async_trait::async_trait;
use handlebars::Handlebars;
use serde::Serialize;
use std::process::Stdio;
use std::time::Duration;
use tracing::debug;

use super::{GatewayError, ModelGateway};
use crate::config::CommandConfig;

#[derive(Debug, Serialize)]
struct ChatContext<'a> {
    system: &'a str,
    user: &'a str,
}

#[derive(Debug, Serialize)]
struct ArgContext<'a> {
    model: &'a str,
    threads: u32,
    prompt: &'a str,
    system: &'a str,
    user: &'a str,
}

/// Runs one process per model call and returns its stdout
pub struct CommandGateway {
    program: String,
    model: String,
    threads: u32,
    args: Vec<String>,
    chat_format: String,
    timeout: Option<Duration>,
    hbs: Handlebars<'static>,
}

impl CommandGateway {
    pub fn from_config(config: &CommandConfig) -> Result<Self, GatewayError> {
        debug!(?config, "CommandGateway::from_config: called");
        if config.program.trim().is_empty() {
            return Err(GatewayError::Config("command gateway needs a program".to_string()));
        }

        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);

        Ok(Self {
            program: config.program.clone(),
            model: config.model.clone(),
            threads: config.threads,
            args: config.args.clone(),
            chat_format: config.chat_format.clone(),
            timeout: config.timeout_ms.map(Duration::from_millis),
            hbs,
        })
    }

    fn render(&self, template: &str, data: &impl Serialize) -> Result<String, GatewayError> {
        self.hbs
            .render_template(template, data)
            .map_err(|e| GatewayError::Config(format!("Failed to render '{}': {}", template, e)))
    }

    /// Fold the system and user prompt into the single prompt the binary takes
    fn chat_prompt(&self, user_prompt: &str, system_prompt: &str) -> Result<String, GatewayError> {
        self.render(
            &self.chat_format,
            &ChatContext {
                system: system_prompt,
                user: user_prompt,
            },
        )
    }

    fn build_args(&self, user_prompt: &str, system_prompt: &str) -> Result<Vec<String>, GatewayError> {
        let prompt = self.chat_prompt(user_prompt, system_prompt)?;
        let ctx = ArgContext {
            model: &self.model,
            threads: self.threads,
            prompt: &prompt,
            system: system_prompt,
            user: user_prompt,
        };
        self.args.iter().map(|arg| self.render(arg, &ctx)).collect()
    }
}

#[async_trait]
impl ModelGateway for CommandGateway {
    async fn invoke(&self, user_prompt: &str, system_prompt: &str) -> Result<String, GatewayError> {
        debug!(
            program = %self.program,
            user_len = user_prompt.len(),
            system_len = system_prompt.len(),
            "CommandGateway::invoke: called"
        );
        let args = self.build_args(user_prompt, system_prompt)?;

        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, command.output()).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(?timeout, "CommandGateway::invoke: timed out");
                    return Err(GatewayError::Timeout(timeout));
                }
            },
            None => command.output().await,
        }
        .map_err(|source| GatewayError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            debug!(status = ?output.status, "CommandGateway::invoke: process failed");
            return Err(GatewayError::Exit {
                program: self.program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(stdout_len = stdout.len(), "CommandGateway::invoke: completed");
        Ok(stdout.trim_end().to_string())
    }
}
