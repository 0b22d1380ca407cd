//! Template distillation: abstract a reusable strategy, then title it

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::EngineError;
use crate::gateway::ModelGateway;
use crate::prompts::{PromptBuilder, TITLE_BEGIN, TITLE_END};
use crate::template::ThoughtTemplate;

/// Text strictly between the first `[title begin]` and the first `[title end]`, trimmed
///
/// A blank title is a formatting failure like a missing marker.
pub fn extract_title(response: &str) -> Result<String, EngineError> {
    let (Some(begin), Some(end)) = (response.find(TITLE_BEGIN), response.find(TITLE_END)) else {
        return Err(EngineError::malformed("can not find title", response));
    };
    let start = begin + TITLE_BEGIN.len();
    if start >= end {
        return Err(EngineError::malformed(
            "title start position is not before end position",
            response,
        ));
    }
    let title = response[start..end].trim();
    if title.is_empty() {
        return Err(EngineError::malformed("empty title", response));
    }
    Ok(title.to_string())
}

/// Derives candidate templates from question/answer pairs
pub struct TemplateDistiller {
    gateway: Arc<dyn ModelGateway>,
    prompts: Arc<PromptBuilder>,
}

impl TemplateDistiller {
    pub fn new(gateway: Arc<dyn ModelGateway>, prompts: Arc<PromptBuilder>) -> Self {
        Self { gateway, prompts }
    }

    /// Generalize a thought template from one question and its answer
    pub async fn abstract_template(&self, question: &str, answer: &str) -> Result<String, EngineError> {
        debug!(answer_len = answer.len(), "TemplateDistiller::abstract_template: called");
        let prompt = self.prompts.abstraction(question, answer)?;
        Ok(self.gateway.invoke(&prompt.user, &prompt.system).await?)
    }

    /// Ask the model for a title and cut it out of the markers
    pub async fn title_of(&self, content: &str) -> Result<String, EngineError> {
        debug!(content_len = content.len(), "TemplateDistiller::title_of: called");
        let prompt = self.prompts.title(content)?;
        let response = self.gateway.invoke(&prompt.user, &prompt.system).await?;
        extract_title(&response).inspect_err(|e| warn!(error = %e, "Model did not follow title format"))
    }

    /// Abstract and title a new, not yet persisted, candidate
    pub async fn distill_candidate(&self, question: &str, answer: &str) -> Result<ThoughtTemplate, EngineError> {
        let content = self.abstract_template(question, answer).await?;
        let title = self.title_of(&content).await?;
        Ok(ThoughtTemplate::candidate(title, content))
    }
}
