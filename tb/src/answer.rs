//! Question distillation and answering

use std::sync::Arc;

use tracing::debug;

use crate::error::EngineError;
use crate::gateway::ModelGateway;
use crate::prompts::PromptBuilder;

/// Produces the final answer, optionally guided by a thought template
pub struct AnswerEngine {
    gateway: Arc<dyn ModelGateway>,
    prompts: Arc<PromptBuilder>,
}

impl AnswerEngine {
    pub fn new(gateway: Arc<dyn ModelGateway>, prompts: Arc<PromptBuilder>) -> Self {
        Self { gateway, prompts }
    }

    /// Extract key information and constraints from the question without answering it
    pub async fn distill(&self, question: &str) -> Result<String, EngineError> {
        debug!(question_len = question.len(), "AnswerEngine::distill: called");
        let prompt = self.prompts.distill(question)?;
        Ok(self.gateway.invoke(&prompt.user, &prompt.system).await?)
    }

    /// Answer the question using the distilled information and an optional template
    pub async fn answer(
        &self,
        question: &str,
        distilled: &str,
        template_content: Option<&str>,
    ) -> Result<String, EngineError> {
        debug!(
            with_template = template_content.is_some_and(|t| !t.is_empty()),
            "AnswerEngine::answer: called"
        );
        let prompt = self.prompts.answer(question, distilled, template_content)?;
        Ok(self.gateway.invoke(&prompt.user, &prompt.system).await?)
    }
}
