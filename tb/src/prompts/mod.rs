//! Prompt Template System
//!
//! Renders the fixed conversations the engine has with the model: question
//! distillation, answering, template abstraction, titling, selection and
//! arbitration.
//!
//! Template loading chain:
//! 1. `{override_dir}/{name}.pmt` (user override, `.thoughtbuffer/prompts/` by default)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

mod builder;
pub mod embedded;

pub use builder::{NO_SUITABLE_OPTIONS, Prompt, PromptBuilder, TITLE_BEGIN, TITLE_END};
