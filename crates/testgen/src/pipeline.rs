//! Binds the generation store to a backend.
//!
//! The store sits behind a `parking_lot::RwLock` that is only ever taken for
//! a single statement, never across an `.await`. Every transition that must
//! be visible before a model call (round reset, `Pending`) happens before
//! the call is issued.

use crate::backend::GenerationBackend;
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use testgen_core::state::StoreSnapshot;
use testgen_core::{
    build_code_prompt, build_summary_prompt, parse_summaries, CodeGenerationState, CodeOutcome,
    CodeStatus, Error, FileRecord, GenerationStore, ResolutionPolicy, SummaryItem,
};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<RwLock<GenerationStore>>,
    backend: Arc<dyn GenerationBackend>,
}

/// Handle to one in-flight code generation attempt. Dropping it does not
/// cancel the attempt.
#[derive(Debug)]
pub struct CodeTask {
    pub index: usize,
    handle: JoinHandle<CodeGenerationState>,
}

impl CodeTask {
    /// Wait for the backend and return the state this attempt produced. The
    /// store may hold something else if a newer round or attempt won.
    pub async fn wait(self) -> Result<CodeGenerationState, Error> {
        self.handle
            .await
            .map_err(|e| Error::Backend(format!("code generation task failed: {e}")))
    }
}

impl Pipeline {
    pub fn new(backend: Arc<dyn GenerationBackend>, policy: ResolutionPolicy) -> Self {
        Self {
            store: Arc::new(RwLock::new(GenerationStore::new(policy))),
            backend,
        }
    }

    /// Run one summary round over `files`.
    ///
    /// The previous summaries and all code states are dropped as soon as the
    /// round starts. A blank response is a successful round with no items.
    /// When a newer round started meanwhile, the live summaries are returned
    /// instead of this round's.
    pub async fn generate_summaries(
        &self,
        files: &[FileRecord],
    ) -> Result<Vec<SummaryItem>, Error> {
        let prompt = build_summary_prompt(files)?;
        let ticket = self.store.write().begin_round();

        log::info!("Generating summaries for {} file(s)", files.len());

        let raw = self
            .backend
            .complete(&prompt)
            .await
            .map_err(Error::generation)?;

        let items = parse_summaries(&raw);

        let mut store = self.store.write();
        if !store.finish_round(ticket, items.clone()) {
            log::warn!("Summary round superseded by a newer one, result discarded");
            return Ok(store.summaries().to_vec());
        }

        log::info!("Generated {} summaries", items.len());
        Ok(items)
    }

    /// Drop every summary and code state. Results still in flight are
    /// discarded when they arrive.
    pub fn reset(&self) {
        self.store.write().begin_round();
        log::info!("Session reset");
    }

    /// Start code generation for the summary at `index`.
    ///
    /// The entry is `Pending` when this returns; the backend call runs on its
    /// own task. Fails only for caller errors (blank summary, unknown index).
    pub fn request_code(&self, index: usize, summary: &str) -> Result<CodeTask, Error> {
        let prompt = build_code_prompt(summary)?;
        let ticket = self.store.write().begin_code(index)?;

        log::debug!("Code attempt {} started for summary {}", ticket.attempt, index);

        let store = Arc::clone(&self.store);
        let backend = Arc::clone(&self.backend);

        let handle = tokio::spawn(async move {
            let outcome = CodeOutcome::from_response(backend.complete(&prompt).await);

            if let CodeOutcome::Failed(reason) = &outcome {
                log::warn!("Code generation for summary {index} failed: {reason}");
            }

            let state = outcome.clone().into_state();
            if !store.write().complete_code(ticket, outcome) {
                log::debug!(
                    "Discarded stale result of attempt {} for summary {}",
                    ticket.attempt,
                    index
                );
            }
            state
        });

        Ok(CodeTask { index, handle })
    }

    /// Start code generation using the live summary text at `index`.
    pub fn request_code_at(&self, index: usize) -> Result<CodeTask, Error> {
        let summary = self
            .store
            .read()
            .summary(index)
            .map(|item| item.text.clone())
            .ok_or_else(|| Error::invalid_input(format!("No summary at index {index}")))?;

        self.request_code(index, &summary)
    }

    /// Request code for several summaries at once and wait for all of them.
    pub async fn generate_code_for(
        &self,
        indices: &[usize],
    ) -> Result<Vec<(usize, CodeStatus)>, Error> {
        let tasks = indices
            .iter()
            .map(|&index| self.request_code_at(index))
            .collect::<Result<Vec<_>, _>>()?;

        let results = join_all(tasks.into_iter().map(|task| async move {
            let index = task.index;
            (index, task.wait().await)
        }))
        .await;

        results
            .into_iter()
            .map(|(index, result)| result.map(|state| (index, state.status)))
            .collect()
    }

    pub fn summaries(&self) -> Vec<SummaryItem> {
        self.store.read().summaries().to_vec()
    }

    pub fn code_state(&self, index: usize) -> Option<CodeGenerationState> {
        self.store.read().code_state(index).cloned()
    }

    /// Status for `index`, `Idle` when nothing was requested.
    pub fn status(&self, index: usize) -> CodeStatus {
        self.store.read().status(index)
    }

    pub fn code_states(&self) -> HashMap<usize, CodeGenerationState> {
        self.store.read().code_states().clone()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.read().snapshot()
    }
}
