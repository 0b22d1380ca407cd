//! Template selection
//!
//! The model sees every stored title as `(i) title` plus a final
//! `(n+1) No available options` and answers with one parenthesized index.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::EngineError;
use crate::gateway::ModelGateway;
use crate::prompts::PromptBuilder;
use crate::template::ThoughtTemplate;

/// Find the chosen 1-based option in a raw response
///
/// Indices are scanned from `count` down to 1 and the first `(i)` found as a
/// substring wins, so when several markers appear the highest one is taken.
/// The sentinel `(count + 1)` and unparseable output both give `None`.
pub fn parse_choice(response: &str, count: usize) -> Option<usize> {
    (1..=count).rev().find(|i| response.contains(&format!("({})", i)))
}

/// Asks the model which stored template fits a question
pub struct TemplateSelector {
    gateway: Arc<dyn ModelGateway>,
    prompts: Arc<PromptBuilder>,
}

impl TemplateSelector {
    pub fn new(gateway: Arc<dyn ModelGateway>, prompts: Arc<PromptBuilder>) -> Self {
        Self { gateway, prompts }
    }

    /// Pick one of `templates` for `question`, or none
    pub async fn select(
        &self,
        question: &str,
        templates: &[ThoughtTemplate],
    ) -> Result<Option<ThoughtTemplate>, EngineError> {
        debug!(count = templates.len(), "TemplateSelector::select: called");
        if templates.is_empty() {
            debug!("TemplateSelector::select: no templates, skipping model call");
            return Ok(None);
        }

        let titles: Vec<&str> = templates.iter().map(|t| t.title.as_str()).collect();
        let prompt = self.prompts.select(question, &titles)?;
        let response = self.gateway.invoke(&prompt.user, &prompt.system).await?;

        match parse_choice(&response, templates.len()) {
            Some(i) => {
                let chosen = &templates[i - 1];
                info!(option = i, title = %chosen.title, "Selected thought template");
                Ok(Some(chosen.clone()))
            }
            None => {
                info!(response = %response, "No thought template selected");
                Ok(None)
            }
        }
    }
}
