//! ThoughtBuffer - Buffer of Thoughts agent
//!
//! Answers natural-language problems with a language model while building a
//! persistent library of thought templates: generalized strategies distilled
//! from earlier question/answer pairs.
//!
//! # Run lifecycle
//!
//! 1. **Select** - the model picks a stored template for the question, or none
//! 2. **Answer** - distill the question's constraints, then answer with the
//!    template's content as experience
//! 3. **Distill** - abstract a new candidate template and title it
//! 4. **Reconcile** - store the candidate in a fresh slot, or let the model
//!    arbitrate between it and the selected template and keep the winner in
//!    the selected slot
//!
//! # Modules
//!
//! - [`store`] - File-backed template records
//! - [`prompts`] - Prompt templates and rendering
//! - [`gateway`] - Model gateway trait, local binary and HTTP implementations
//! - [`selector`], [`answer`], [`distiller`], [`reconciler`] - Lifecycle steps
//! - [`pipeline`] - The full run
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod answer;
pub mod cli;
pub mod config;
pub mod distiller;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod prompts;
pub mod reconciler;
pub mod selector;
pub mod store;
pub mod template;

// Re-export commonly used types
pub use config::Config;
pub use error::{EngineError, RecordError, StoreError};
pub use gateway::{CommandGateway, GatewayError, ModelGateway, OpenAiGateway, create_gateway};
pub use pipeline::{BufferOfThoughts, DEFAULT_QUESTION, RunOutcome};
pub use prompts::{Prompt, PromptBuilder};
pub use reconciler::{Reconciler, Reconciliation, Verdict};
pub use selector::TemplateSelector;
pub use store::TemplateStore;
pub use template::{SlotId, TemplateRecord, ThoughtTemplate};
