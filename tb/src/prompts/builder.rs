//! Prompt Builder
//!
//! Loads prompt templates from the override directory or falls back to the
//! embedded defaults, and renders them into user/system prompt pairs.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::embedded;
use crate::error::EngineError;
use crate::template::ThoughtTemplate;

/// Marker opening a generated title
pub const TITLE_BEGIN: &str = "[title begin]";

/// Marker closing a generated title
pub const TITLE_END: &str = "[title end]";

/// Arbitration answer meaning neither template fits
pub const NO_SUITABLE_OPTIONS: &str = "<<no suitable options>>";

/// A rendered user prompt with its system prompt (empty for none)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub user: String,
    pub system: String,
}

#[derive(Debug, Serialize)]
struct SelectOption<'a> {
    number: usize,
    title: &'a str,
}

/// Loads and renders prompt templates
pub struct PromptBuilder {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory
    override_dir: Option<PathBuf>,
}

impl PromptBuilder {
    /// Create a builder that prefers `{override_dir}/{name}.pmt` when present
    pub fn new(override_dir: impl AsRef<Path>) -> Self {
        let override_dir = override_dir.as_ref();
        let exists = override_dir.is_dir();
        debug!(?override_dir, %exists, "PromptBuilder::new: called");
        Self {
            hbs: Self::engine(),
            override_dir: exists.then(|| override_dir.to_path_buf()),
        }
    }

    /// Create a builder that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptBuilder::embedded_only: called");
        Self {
            hbs: Self::engine(),
            override_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text, `<<1>>` must survive rendering
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name, override directory first
    fn load_template(&self, name: &str) -> Result<String, EngineError> {
        debug!(%name, "PromptBuilder::load_template: called");
        if let Some(dir) = &self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptBuilder::load_template: found override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| EngineError::Prompt(format!("Failed to read prompt {}: {}", path.display(), e)));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| EngineError::Prompt(format!("Prompt template not found: {}", name)))
    }

    /// Render a template with the given context
    fn render(&self, name: &str, context: &serde_json::Value) -> Result<String, EngineError> {
        let template = self.load_template(name)?;
        let rendered = self
            .hbs
            .render_template(&template, context)
            .map_err(|e| EngineError::Prompt(format!("Failed to render template {}: {}", name, e)))?;
        Ok(rendered.trim_end_matches('\n').to_string())
    }

    /// Raw question with the "extract constraints, do not answer" instruction
    pub fn distill(&self, question: &str) -> Result<Prompt, EngineError> {
        Ok(Prompt {
            user: question.to_string(),
            system: self.render("distill", &json!({}))?,
        })
    }

    /// Question with the distilled techniques and, optionally, a template as experience
    pub fn answer(&self, question: &str, distilled: &str, template: Option<&str>) -> Result<Prompt, EngineError> {
        let system = match template.filter(|t| !t.is_empty()) {
            Some(template) => self.render(
                "answer-with-template",
                &json!({ "distilled": distilled, "template": template }),
            )?,
            None => self.render("answer", &json!({ "distilled": distilled }))?,
        };
        Ok(Prompt {
            user: question.to_string(),
            system,
        })
    }

    /// Ask for a reusable thought template from one question/answer pair
    pub fn abstraction(&self, question: &str, answer: &str) -> Result<Prompt, EngineError> {
        Ok(Prompt {
            user: self.render("abstract", &json!({ "question": question, "answer": answer }))?,
            system: self.render("abstract-system", &json!({}))?,
        })
    }

    /// Ask for a title framed by [`TITLE_BEGIN`] and [`TITLE_END`]
    pub fn title(&self, content: &str) -> Result<Prompt, EngineError> {
        Ok(Prompt {
            user: self.render(
                "title",
                &json!({ "content": content, "begin": TITLE_BEGIN, "end": TITLE_END }),
            )?,
            system: self.render("title-system", &json!({}))?,
        })
    }

    /// Enumerate `(i) title` for each template plus the `(n+1)` sentinel
    pub fn select(&self, question: &str, titles: &[&str]) -> Result<Prompt, EngineError> {
        let options: Vec<SelectOption<'_>> = titles
            .iter()
            .copied()
            .enumerate()
            .map(|(i, title)| SelectOption { number: i + 1, title })
            .collect();
        Ok(Prompt {
            user: self.render(
                "select",
                &json!({ "question": question, "options": options, "sentinel": titles.len() + 1 }),
            )?,
            system: String::new(),
        })
    }

    /// Show two full templates as `<<1>>` and `<<2>>`
    pub fn compare(
        &self,
        question: &str,
        first: &ThoughtTemplate,
        second: &ThoughtTemplate,
    ) -> Result<Prompt, EngineError> {
        Ok(Prompt {
            user: self.render(
                "compare",
                &json!({
                    "question": question,
                    "first": { "title": first.title, "content": first.content },
                    "second": { "title": second.title, "content": second.content },
                    "no_suitable": NO_SUITABLE_OPTIONS,
                }),
            )?,
            system: String::new(),
        })
    }
}
