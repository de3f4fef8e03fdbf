//! Per-summary code generation lifecycle.
//!
//! [`GenerationStore`] owns the current summary list and one
//! [`CodeGenerationState`] per summary index that has been asked for code.
//! Every transition is a plain method on the store; the shell decides when
//! to call them and is responsible for never holding the store across an
//! `.await`.
//!
//! Lifecycle of one attempt:
//!
//! ```text
//! (no entry = Idle) --begin_code--> Pending --complete_code--> Succeeded | Failed
//!                                      ^                            |
//!                                      +--------begin_code----------+
//! ```
//!
//! A summary round ([`GenerationStore::begin_round`]) drops every entry at
//! once. Completions that belong to an older round are ignored, so code can
//! never land on an index that now names a different summary.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::summary::SummaryItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CodeStatus::Idle => "idle",
            CodeStatus::Pending => "pending",
            CodeStatus::Succeeded => "succeeded",
            CodeStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Status of the latest code generation attempt for one summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeGenerationState {
    pub status: CodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl CodeGenerationState {
    pub fn pending() -> Self {
        Self {
            status: CodeStatus::Pending,
            code: None,
        }
    }

    pub fn succeeded(code: impl Into<String>) -> Self {
        Self {
            status: CodeStatus::Succeeded,
            code: Some(code.into()),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: CodeStatus::Failed,
            code: None,
        }
    }
}

/// Result of one backend call for code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeOutcome {
    Succeeded(String),
    Failed(String),
}

impl CodeOutcome {
    /// Classify a backend response. Blank text counts as a failure; any other
    /// text is kept exactly as returned.
    pub fn from_response(response: Result<String, Error>) -> Self {
        match response {
            Ok(code) if code.trim().is_empty() => {
                CodeOutcome::Failed("backend returned an empty response".to_string())
            }
            Ok(code) => CodeOutcome::Succeeded(code),
            Err(err) => CodeOutcome::Failed(err.to_string()),
        }
    }

    pub fn into_state(self) -> CodeGenerationState {
        match self {
            CodeOutcome::Succeeded(code) => CodeGenerationState::succeeded(code),
            CodeOutcome::Failed(_) => CodeGenerationState::failed(),
        }
    }
}

/// How to settle two overlapping attempts for the same index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionPolicy {
    /// Every completion is applied; whichever response arrives last wins.
    #[default]
    LastResolved,
    /// Only the most recently issued attempt may complete; older responses
    /// are dropped.
    LatestIssued,
}

impl FromStr for ResolutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-resolved" => Ok(ResolutionPolicy::LastResolved),
            "latest-issued" => Ok(ResolutionPolicy::LatestIssued),
            other => Err(format!(
                "unknown resolution policy '{other}' (expected 'last-resolved' or 'latest-issued')"
            )),
        }
    }
}

impl fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionPolicy::LastResolved => f.write_str("last-resolved"),
            ResolutionPolicy::LatestIssued => f.write_str("latest-issued"),
        }
    }
}

/// Identifies one summary generation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTicket {
    epoch: u64,
}

/// Identifies one code generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTicket {
    pub index: usize,
    pub attempt: u64,
    epoch: u64,
}

/// Serializable view of the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub summaries: Vec<SummaryItem>,
    pub code: BTreeMap<usize, CodeGenerationState>,
}

#[derive(Debug, Default)]
pub struct GenerationStore {
    policy: ResolutionPolicy,
    summaries: Vec<SummaryItem>,
    codes: HashMap<usize, CodeGenerationState>,
    latest_attempt: HashMap<usize, u64>,
    epoch: u64,
    next_attempt: u64,
}

impl GenerationStore {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Start a summary round: the summary list and every code state are
    /// dropped immediately.
    pub fn begin_round(&mut self) -> RoundTicket {
        self.epoch += 1;
        self.summaries.clear();
        self.codes.clear();
        self.latest_attempt.clear();
        RoundTicket { epoch: self.epoch }
    }

    /// Install the summaries produced by a round. Returns `false` (and
    /// changes nothing) when a newer round has started since `ticket`.
    pub fn finish_round(&mut self, ticket: RoundTicket, items: Vec<SummaryItem>) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        self.summaries = items;
        self.codes.clear();
        self.latest_attempt.clear();
        true
    }

    /// Replace the summary list in one step.
    pub fn replace_summaries(&mut self, items: Vec<SummaryItem>) {
        let ticket = self.begin_round();
        self.finish_round(ticket, items);
    }

    /// Mark `index` as pending and hand out the ticket its completion must
    /// present. Any earlier code for the index is discarded.
    pub fn begin_code(&mut self, index: usize) -> Result<AttemptTicket, Error> {
        if index >= self.summaries.len() {
            return Err(Error::invalid_input(format!(
                "No summary at index {index} ({} available)",
                self.summaries.len()
            )));
        }

        self.next_attempt += 1;
        let attempt = self.next_attempt;
        self.latest_attempt.insert(index, attempt);
        self.codes.insert(index, CodeGenerationState::pending());

        Ok(AttemptTicket {
            index,
            attempt,
            epoch: self.epoch,
        })
    }

    /// Apply the outcome of an attempt. Returns whether the state changed.
    pub fn complete_code(&mut self, ticket: AttemptTicket, outcome: CodeOutcome) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }

        if self.policy == ResolutionPolicy::LatestIssued
            && self.latest_attempt.get(&ticket.index) != Some(&ticket.attempt)
        {
            return false;
        }

        self.codes.insert(ticket.index, outcome.into_state());
        true
    }

    pub fn summaries(&self) -> &[SummaryItem] {
        &self.summaries
    }

    pub fn summary(&self, index: usize) -> Option<&SummaryItem> {
        self.summaries.get(index)
    }

    /// The recorded state for `index`, if code was ever requested this round.
    pub fn code_state(&self, index: usize) -> Option<&CodeGenerationState> {
        self.codes.get(&index)
    }

    /// Status for `index`, `Idle` when nothing was requested.
    pub fn status(&self, index: usize) -> CodeStatus {
        self.codes
            .get(&index)
            .map(|state| state.status)
            .unwrap_or(CodeStatus::Idle)
    }

    pub fn code_states(&self) -> &HashMap<usize, CodeGenerationState> {
        &self.codes
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            summaries: self.summaries.clone(),
            code: self
                .codes
                .iter()
                .map(|(index, state)| (*index, state.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::parse_summaries;

    fn store_with(count: usize, policy: ResolutionPolicy) -> GenerationStore {
        let raw = (1..=count)
            .map(|n| format!("{n}. case {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        let mut store = GenerationStore::new(policy);
        store.replace_summaries(parse_summaries(&raw));
        store
    }

    fn ok(code: &str) -> CodeOutcome {
        CodeOutcome::Succeeded(code.to_string())
    }

    fn fail() -> CodeOutcome {
        CodeOutcome::Failed("boom".to_string())
    }

    // ============================================================================
    // single attempt
    // ============================================================================

    #[test]
    fn test_untouched_index_is_idle() {
        let store = store_with(3, ResolutionPolicy::default());
        assert_eq!(store.status(1), CodeStatus::Idle);
        assert!(store.code_state(1).is_none());
    }

    #[test]
    fn test_begin_sets_pending_before_completion() {
        let mut store = store_with(3, ResolutionPolicy::default());
        store.begin_code(2).unwrap();
        assert_eq!(store.code_state(2), Some(&CodeGenerationState::pending()));
    }

    #[test]
    fn test_success_stores_code_and_leaves_others_alone() {
        let mut store = store_with(4, ResolutionPolicy::default());
        let other = store.begin_code(0).unwrap();
        store.complete_code(other, ok("OTHER"));

        let ticket = store.begin_code(2).unwrap();
        assert!(store.complete_code(ticket, ok("CODE")));

        assert_eq!(
            store.code_state(2),
            Some(&CodeGenerationState::succeeded("CODE"))
        );
        assert_eq!(
            store.code_state(0),
            Some(&CodeGenerationState::succeeded("OTHER"))
        );
        assert_eq!(store.status(1), CodeStatus::Idle);
        assert_eq!(store.status(3), CodeStatus::Idle);
    }

    #[test]
    fn test_failure_then_retry_succeeds() {
        let mut store = store_with(3, ResolutionPolicy::default());
        let first = store.begin_code(2).unwrap();
        store.complete_code(first, fail());
        assert_eq!(store.code_state(2), Some(&CodeGenerationState::failed()));

        let second = store.begin_code(2).unwrap();
        assert_eq!(store.status(2), CodeStatus::Pending);
        store.complete_code(second, ok("NEW"));
        assert_eq!(
            store.code_state(2),
            Some(&CodeGenerationState::succeeded("NEW"))
        );
    }

    #[test]
    fn test_restart_from_succeeded_drops_old_code() {
        let mut store = store_with(1, ResolutionPolicy::default());
        let first = store.begin_code(0).unwrap();
        store.complete_code(first, ok("OLD"));

        store.begin_code(0).unwrap();
        assert_eq!(store.code_state(0), Some(&CodeGenerationState::pending()));
    }

    #[test]
    fn test_unknown_index_rejected() {
        let mut store = store_with(2, ResolutionPolicy::default());
        let err = store.begin_code(2).unwrap_err();
        assert!(err.is_caller_error());
        assert!(store.code_states().is_empty());
    }

    #[test]
    fn test_outcome_from_response() {
        assert_eq!(
            CodeOutcome::from_response(Ok("  assert 1\n".to_string())),
            CodeOutcome::Succeeded("  assert 1\n".to_string())
        );
        assert!(matches!(
            CodeOutcome::from_response(Ok(" \n".to_string())),
            CodeOutcome::Failed(_)
        ));
        assert!(matches!(
            CodeOutcome::from_response(Err(Error::Backend("503".to_string()))),
            CodeOutcome::Failed(_)
        ));
    }

    // ============================================================================
    // rounds
    // ============================================================================

    #[test]
    fn test_new_round_clears_every_code_state() {
        let mut store = store_with(3, ResolutionPolicy::default());
        let done = store.begin_code(0).unwrap();
        store.complete_code(done, ok("CODE"));
        store.begin_code(1).unwrap();

        store.replace_summaries(parse_summaries("x\ny"));

        assert_eq!(
            store
                .summaries()
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>(),
            vec!["x", "y"]
        );
        assert!(store.code_states().is_empty());
    }

    #[test]
    fn test_begin_round_clears_immediately() {
        let mut store = store_with(3, ResolutionPolicy::default());
        let done = store.begin_code(0).unwrap();
        store.complete_code(done, ok("CODE"));

        store.begin_round();

        assert!(store.summaries().is_empty());
        assert!(store.code_states().is_empty());
        assert!(store.begin_code(0).is_err());
    }

    #[test]
    fn test_completion_from_previous_round_ignored() {
        let mut store = store_with(3, ResolutionPolicy::default());
        let stale = store.begin_code(1).unwrap();

        store.replace_summaries(parse_summaries("a\nb\nc"));
        assert!(!store.complete_code(stale, ok("STALE")));
        assert!(store.code_state(1).is_none());
    }

    #[test]
    fn test_superseded_round_does_not_install() {
        let mut store = GenerationStore::default();
        let first = store.begin_round();
        let second = store.begin_round();

        assert!(store.finish_round(second, parse_summaries("new")));
        assert!(!store.finish_round(first, parse_summaries("old\nolder")));
        assert_eq!(store.summaries().len(), 1);
        assert_eq!(store.summaries()[0].text, "new");
    }

    // ============================================================================
    // overlapping attempts on one index
    // ============================================================================

    #[test]
    fn test_last_resolved_takes_last_arrival() {
        let mut store = store_with(6, ResolutionPolicy::LastResolved);
        let a = store.begin_code(5).unwrap();
        let b = store.begin_code(5).unwrap();

        store.complete_code(b, ok("B"));
        store.complete_code(a, ok("A"));
        assert_eq!(
            store.code_state(5),
            Some(&CodeGenerationState::succeeded("A"))
        );
    }

    #[test]
    fn test_last_resolved_failure_can_win() {
        let mut store = store_with(6, ResolutionPolicy::LastResolved);
        let a = store.begin_code(5).unwrap();
        let b = store.begin_code(5).unwrap();

        store.complete_code(a, ok("A"));
        store.complete_code(b, fail());
        assert_eq!(store.code_state(5), Some(&CodeGenerationState::failed()));
    }

    #[test]
    fn test_latest_issued_drops_older_attempt() {
        let mut store = store_with(6, ResolutionPolicy::LatestIssued);
        let a = store.begin_code(5).unwrap();
        let b = store.begin_code(5).unwrap();

        assert!(store.complete_code(b, ok("B")));
        assert!(!store.complete_code(a, ok("A")));
        assert_eq!(
            store.code_state(5),
            Some(&CodeGenerationState::succeeded("B"))
        );
    }

    #[test]
    fn test_latest_issued_keeps_pending_until_newest_resolves() {
        let mut store = store_with(6, ResolutionPolicy::LatestIssued);
        let a = store.begin_code(5).unwrap();
        let b = store.begin_code(5).unwrap();

        store.complete_code(a, ok("A"));
        assert_eq!(store.status(5), CodeStatus::Pending);
        store.complete_code(b, fail());
        assert_eq!(store.status(5), CodeStatus::Failed);
    }

    // ============================================================================
    // snapshot and parsing helpers
    // ============================================================================

    #[test]
    fn test_snapshot_serializes_sorted_states() {
        let mut store = store_with(3, ResolutionPolicy::default());
        let t = store.begin_code(2).unwrap();
        store.complete_code(t, ok("CODE"));
        store.begin_code(0).unwrap();

        let json = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(json["code"]["0"], serde_json::json!({ "status": "pending" }));
        assert_eq!(
            json["code"]["2"],
            serde_json::json!({ "status": "succeeded", "code": "CODE" })
        );
        assert_eq!(json["summaries"][1]["text"], "2. case 2");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "last-resolved".parse::<ResolutionPolicy>(),
            Ok(ResolutionPolicy::LastResolved)
        );
        assert_eq!(
            "latest-issued".parse::<ResolutionPolicy>(),
            Ok(ResolutionPolicy::LatestIssued)
        );
        assert!("newest".parse::<ResolutionPolicy>().is_err());
        assert_eq!(ResolutionPolicy::LatestIssued.to_string(), "latest-issued");
    }
}
