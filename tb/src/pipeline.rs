//! One Buffer of Thoughts run: select → answer → distill → reconcile

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::answer::AnswerEngine;
use crate::config::Config;
use crate::distiller::TemplateDistiller;
use crate::error::EngineError;
use crate::gateway::ModelGateway;
use crate::prompts::PromptBuilder;
use crate::reconciler::{Reconciler, Reconciliation};
use crate::selector::TemplateSelector;
use crate::store::TemplateStore;
use crate::template::ThoughtTemplate;

/// Question used when none is given on the command line
pub const DEFAULT_QUESTION: &str =
    "Write Python code to find the maximum value of x^3+2*x-10 in the interval [0,100] and output the corresponding x.";

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The answer to print
    pub answer: String,
    /// Template the selector picked, as it was before reconciliation
    pub selected: Option<ThoughtTemplate>,
    /// Where the run's template was persisted
    pub reconciliation: Reconciliation,
}

/// The template lifecycle engine
pub struct BufferOfThoughts<R: Rng = StdRng> {
    store: TemplateStore,
    selector: TemplateSelector,
    answers: AnswerEngine,
    distiller: TemplateDistiller,
    reconciler: Reconciler<R>,
}

impl BufferOfThoughts<StdRng> {
    /// Wire the engine from configuration
    ///
    /// Coin flips are seeded from `config.seed` when set, otherwise from the OS.
    pub fn from_config(config: &Config, gateway: Arc<dyn ModelGateway>) -> Result<Self, EngineError> {
        let store = TemplateStore::open(&config.store.path)?;
        let prompts = PromptBuilder::new(&config.prompts.dir);
        let rng = match config.seed {
            Some(seed) => {
                debug!(seed, "BufferOfThoughts::from_config: seeded rng");
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_os_rng(),
        };
        Ok(Self::new(gateway, prompts, store, rng))
    }
}

impl<R: Rng> BufferOfThoughts<R> {
    pub fn new(gateway: Arc<dyn ModelGateway>, prompts: PromptBuilder, store: TemplateStore, rng: R) -> Self {
        let prompts = Arc::new(prompts);
        Self {
            selector: TemplateSelector::new(gateway.clone(), prompts.clone()),
            answers: AnswerEngine::new(gateway.clone(), prompts.clone()),
            distiller: TemplateDistiller::new(gateway.clone(), prompts.clone()),
            reconciler: Reconciler::new(gateway, prompts, store.clone(), rng),
            store,
        }
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Answer `question` and fold what was learned back into the store
    ///
    /// Any error aborts before the store is written.
    pub async fn run(&mut self, question: &str) -> Result<RunOutcome, EngineError> {
        debug!(%question, "BufferOfThoughts::run: called");
        let templates = self.store.list_all()?;
        info!(count = templates.len(), "Loaded thought templates");

        let selected = self.selector.select(question, &templates).await?;

        let distilled = self.answers.distill(question).await?;
        let answer = self
            .answers
            .answer(question, &distilled, selected.as_ref().map(|t| t.content.as_str()))
            .await?;

        let candidate = self.distiller.distill_candidate(question, &answer).await?;
        let reconciliation = self.reconciler.reconcile(question, selected.as_ref(), candidate).await?;
        info!(?reconciliation, "Run complete");

        Ok(RunOutcome {
            answer,
            selected,
            reconciliation,
        })
    }
}
