//! Reconciliation of a new candidate against the selected template
//!
//! With nothing selected the candidate gets a fresh slot. Otherwise the model
//! arbitrates between the selected template and the candidate, and the winner
//! is written into the selected template's slot.

use std::sync::Arc;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::gateway::ModelGateway;
use crate::prompts::{NO_SUITABLE_OPTIONS, PromptBuilder};
use crate::store::TemplateStore;
use crate::template::{SlotId, ThoughtTemplate};

const FIRST_MARKER: &str = "<<1>>";
const SECOND_MARKER: &str = "<<2>>";

/// What the model said in an arbitration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Only `<<1>>` present
    First,
    /// Only `<<2>>` present
    Second,
    /// `<<no suitable options>>` present
    NoSuitable,
    /// Both markers or neither
    Undecided,
}

/// Classify an arbitration response by literal substring checks
pub fn parse_verdict(response: &str) -> Verdict {
    if response.contains(NO_SUITABLE_OPTIONS) {
        return Verdict::NoSuitable;
    }
    match (response.contains(FIRST_MARKER), response.contains(SECOND_MARKER)) {
        (true, false) => Verdict::First,
        (false, true) => Verdict::Second,
        _ => Verdict::Undecided,
    }
}

/// Where the run's template ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing was selected; the candidate got a new slot
    Created(SlotId),
    /// The selected template won arbitration and was rewritten in place
    Kept(SlotId),
    /// The candidate won arbitration and replaced the selected template
    Replaced(SlotId),
}

impl Reconciliation {
    pub fn slot(&self) -> &SlotId {
        match self {
            Reconciliation::Created(slot) | Reconciliation::Kept(slot) | Reconciliation::Replaced(slot) => slot,
        }
    }
}

/// Persists candidates, arbitrating against the selected template when there is one
pub struct Reconciler<R: Rng = StdRng> {
    gateway: Arc<dyn ModelGateway>,
    prompts: Arc<PromptBuilder>,
    store: TemplateStore,
    rng: R,
}

impl<R: Rng> Reconciler<R> {
    pub fn new(gateway: Arc<dyn ModelGateway>, prompts: Arc<PromptBuilder>, store: TemplateStore, rng: R) -> Self {
        Self {
            gateway,
            prompts,
            store,
            rng,
        }
    }

    fn coin(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }

    /// Ask the model which of two templates better fits the question
    ///
    /// Positions are shuffled before prompting. A no-suitable or unparseable
    /// verdict falls back to a fair random pick.
    pub async fn choose_better<'t>(
        &mut self,
        question: &str,
        a: &'t ThoughtTemplate,
        b: &'t ThoughtTemplate,
    ) -> Result<&'t ThoughtTemplate, EngineError> {
        let (first, second) = if self.coin() { (a, b) } else { (b, a) };
        debug!(first = %first.title, second = %second.title, "Reconciler::choose_better: called");

        let prompt = self.prompts.compare(question, first, second)?;
        let response = self.gateway.invoke(&prompt.user, &prompt.system).await?;

        let winner = match parse_verdict(&response) {
            Verdict::First => first,
            Verdict::Second => second,
            verdict @ (Verdict::NoSuitable | Verdict::Undecided) => {
                debug!(?verdict, "Reconciler::choose_better: falling back to random pick");
                if verdict == Verdict::Undecided {
                    warn!(response = %response, "Unparseable arbitration answer, picking at random");
                }
                if self.coin() { first } else { second }
            }
        };
        Ok(winner)
    }

    /// Persist the outcome of this run
    pub async fn reconcile(
        &mut self,
        question: &str,
        selected: Option<&ThoughtTemplate>,
        candidate: ThoughtTemplate,
    ) -> Result<Reconciliation, EngineError> {
        let Some(selected) = selected else {
            let slot = self.store.save(&candidate, None)?;
            info!(%slot, title = %candidate.title, "Created new thought template");
            return Ok(Reconciliation::Created(slot));
        };

        let slot = selected
            .slot
            .clone()
            .ok_or_else(|| EngineError::NotPersisted(selected.title.clone()))?;

        let winner = self.choose_better(question, selected, &candidate).await?;
        let kept = std::ptr::eq(winner, selected);
        self.store.save(winner, Some(&slot))?;

        if kept {
            info!(%slot, title = %winner.title, "Kept selected thought template");
            Ok(Reconciliation::Kept(slot))
        } else {
            info!(%slot, old = %selected.title, new = %winner.title, "Replaced thought template");
            Ok(Reconciliation::Replaced(slot))
        }
    }
}
