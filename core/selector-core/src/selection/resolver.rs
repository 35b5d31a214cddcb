//! Resume and commit: the two halves of one selection interaction.
//!
//! ```text
//! Resumed ──(empty id)──────────────────────────────▶ ReSuspended (same token)
//!    │
//!    └──(id)──▶ Committing ──(accepted)─────────────▶ Completed
//!                    │
//!                    └──(rejected)──▶ save w/ error ─▶ ReSuspended (new token)
//! ```
//!
//! Each step takes its input by value and returns a new value. The store is
//! only written on rejection, and the written entry is always a new token.
//! A rejected remembered id is dropped from the re-suspended state.

use super::request::{SelectionAttempt, SelectionRequest};
use super::source::SelectionSource;
use crate::error::ResumeError;
use crate::state::{Stage, StateStore, StoreError, SuspendedState, Token};

/// Selection accepted; the parent flow continues from `state`.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Resumed state with any previous error cleared.
    pub state: SuspendedState,
    pub selected_id: String,
}

/// The flow stays suspended and the selection page is shown again.
#[derive(Debug, Clone, PartialEq)]
pub struct Suspension {
    /// State to render from. Its token is the one to embed in the form.
    pub state: SuspendedState,
    /// Set when a new token was minted; holds the one it replaces.
    pub previous_token: Option<Token>,
}

impl Suspension {
    pub fn reissued(&self) -> bool {
        self.previous_token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Completion),
    ReSuspended(Suspension),
}

/// Validates the request token and loads its state under `stage`.
pub fn resume(
    store: &dyn StateStore,
    request: &SelectionRequest,
    stage: &Stage,
) -> Result<SuspendedState, ResumeError> {
    let raw = request
        .auth_state
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ResumeError::BadRequest("Missing AuthState parameter".to_string()))?;

    if !store.validate(raw) {
        tracing::debug!(stage = %stage, "Rejected malformed AuthState token");
        return Err(ResumeError::InvalidToken);
    }

    let token = Token::from_raw(raw);
    let resumed = store.load(&token, stage)?;

    tracing::debug!(
        token = %resumed.token,
        stage = %resumed.stage,
        source = %resumed.state.source_id,
        "Resumed suspended state"
    );
    Ok(resumed)
}

/// Commits `attempt` through `source`, re-suspending on rejection.
///
/// On rejection the error is attached to the state and the state is saved
/// under a new token with the source's stage. The entry for the resumed token
/// is left untouched.
pub fn commit(
    store: &mut dyn StateStore,
    source: &dyn SelectionSource,
    resumed: SuspendedState,
    attempt: &SelectionAttempt,
) -> Result<Outcome, StoreError> {
    if attempt.is_empty() {
        tracing::debug!(token = %resumed.token, "No selection yet, showing candidates");
        return Ok(Outcome::ReSuspended(Suspension {
            state: resumed,
            previous_token: None,
        }));
    }

    let SuspendedState {
        token,
        stage,
        state,
    } = resumed;

    match source.attempt_commit(&token, &attempt.candidate_id) {
        Ok(()) => {
            tracing::info!(
                token = %token,
                source = %source.id(),
                candidate = %attempt.candidate_id,
                "Selection committed, resuming parent flow"
            );
            Ok(Outcome::Completed(Completion {
                state: SuspendedState {
                    token,
                    stage,
                    state: state.without_error(),
                },
                selected_id: attempt.candidate_id.clone(),
            }))
        }
        Err(rejection) => {
            let code = rejection.code.clone();
            let mut errored = state.with_error(rejection);
            // A rejected remembered id must not be replayed on the next submit.
            if SelectionAttempt::resolve(None, errored.remembered_id.as_ref()) == *attempt {
                errored = errored.without_remembered_id();
            }
            let stage = source.stage().clone();
            let new_token = store.save(&errored, &stage)?;

            tracing::info!(
                token = %token,
                new_token = %new_token,
                source = %source.id(),
                candidate = %attempt.candidate_id,
                code = %code,
                "Selection rejected, state re-suspended"
            );
            Ok(Outcome::ReSuspended(Suspension {
                state: SuspendedState {
                    token: new_token,
                    stage,
                    state: errored,
                },
                previous_token: Some(token),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::source::{Candidate, StaticSource, ERR_NOT_FOUND};
    use crate::state::{CommitError, FlowState, MemoryStateStore};
    use serde_json::json;

    fn stage() -> Stage {
        Stage::new("selectprofile:select")
    }

    fn source() -> StaticSource {
        StaticSource::new(
            "src1",
            stage(),
            vec![Candidate::new("1"), Candidate::new("2")],
        )
    }

    fn suspend(store: &mut MemoryStateStore, state: FlowState) -> Token {
        store.save(&state, &stage()).unwrap()
    }

    #[test]
    fn test_resume_without_auth_state_is_bad_request() {
        let store = MemoryStateStore::new();
        let result = resume(&store, &SelectionRequest::default(), &stage());
        assert!(matches!(result, Err(ResumeError::BadRequest(_))));
    }

    #[test]
    fn test_resume_with_empty_auth_state_is_bad_request() {
        let store = MemoryStateStore::new();
        let result = resume(&store, &SelectionRequest::new(""), &stage());
        assert!(matches!(result, Err(ResumeError::BadRequest(_))));
    }

    #[test]
    fn test_resume_malformed_token_is_invalid() {
        let store = MemoryStateStore::new();
        let result = resume(&store, &SelectionRequest::new("../../etc/passwd"), &stage());
        assert!(matches!(result, Err(ResumeError::InvalidToken)));
    }

    #[test]
    fn test_resume_unknown_token_is_not_found() {
        let store = MemoryStateStore::new();
        let request = SelectionRequest::new(Token::generate().as_str());
        let result = resume(&store, &request, &stage());
        assert!(matches!(result, Err(ResumeError::StateNotFound)));
    }

    #[test]
    fn test_resume_other_stage_is_mismatch() {
        let mut store = MemoryStateStore::new();
        let token = store
            .save(&FlowState::new("src1"), &Stage::new("consent:ask"))
            .unwrap();
        let result = resume(&store, &SelectionRequest::new(token.as_str()), &stage());
        assert!(matches!(result, Err(ResumeError::StageMismatch { .. })));
    }

    #[test]
    fn test_resume_returns_stored_state() {
        let mut store = MemoryStateStore::new();
        let token = suspend(&mut store, FlowState::new("src1"));
        let resumed = resume(&store, &SelectionRequest::new(token.as_str()), &stage()).unwrap();
        assert_eq!(resumed.token, token);
        assert_eq!(resumed.state.source_id, "src1");
    }

    #[test]
    fn test_commit_empty_attempt_keeps_state() {
        let mut store = MemoryStateStore::new();
        let state = FlowState::new("src1").with_error(CommitError::new(ERR_NOT_FOUND));
        let token = suspend(&mut store, state);
        let resumed = store.load(&token, &stage()).unwrap();

        let outcome = commit(
            &mut store,
            &source(),
            resumed.clone(),
            &SelectionAttempt::resolve(None, None),
        )
        .unwrap();

        match outcome {
            Outcome::ReSuspended(suspension) => {
                assert!(!suspension.reissued());
                assert_eq!(suspension.state, resumed);
            }
            other => panic!("expected re-suspension, got {:?}", other),
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_commit_accepted_clears_error() {
        let mut store = MemoryStateStore::new();
        let state = FlowState::new("src1").with_error(CommitError::new(ERR_NOT_FOUND));
        let token = suspend(&mut store, state);
        let resumed = store.load(&token, &stage()).unwrap();

        let outcome = commit(
            &mut store,
            &source(),
            resumed,
            &SelectionAttempt::resolve(Some("2"), None),
        )
        .unwrap();

        match outcome {
            Outcome::Completed(completion) => {
                assert_eq!(completion.selected_id, "2");
                assert_eq!(completion.state.token, token);
                assert!(completion.state.state.error.is_none());
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_commit_rejected_mints_new_token_with_error() {
        let mut store = MemoryStateStore::new();
        let token = suspend(&mut store, FlowState::new("src1"));
        let resumed = store.load(&token, &stage()).unwrap();

        let outcome = commit(
            &mut store,
            &source(),
            resumed,
            &SelectionAttempt::resolve(Some("42"), None),
        )
        .unwrap();

        let Outcome::ReSuspended(suspension) = outcome else {
            panic!("expected re-suspension");
        };
        assert_eq!(suspension.previous_token.as_ref(), Some(&token));
        assert_ne!(suspension.state.token, token);

        let reloaded = store.load(&suspension.state.token, &stage()).unwrap();
        let error = reloaded.state.error.unwrap();
        assert_eq!(error.code, ERR_NOT_FOUND);
        assert_eq!(error.params.get("id"), Some(&json!("42")));

        let original = store.load(&token, &stage()).unwrap();
        assert!(original.state.error.is_none());
    }

    #[test]
    fn test_commit_rejected_remembered_id_is_dropped() {
        let mut store = MemoryStateStore::new();
        let token = suspend(&mut store, FlowState::new("src1").with_remembered_id("42"));
        let resumed = store.load(&token, &stage()).unwrap();
        let attempt = SelectionAttempt::resolve(None, resumed.state.remembered_id.as_ref());

        let outcome = commit(&mut store, &source(), resumed, &attempt).unwrap();

        let Outcome::ReSuspended(suspension) = outcome else {
            panic!("expected re-suspension");
        };
        assert!(suspension.state.state.remembered_id.is_none());
        let reloaded = store.load(&suspension.state.token, &stage()).unwrap();
        assert!(reloaded.state.remembered_id.is_none());
        assert_eq!(
            store.load(&token, &stage()).unwrap().state.remembered_id,
            Some(json!("42"))
        );
    }

    #[test]
    fn test_commit_rejected_request_id_keeps_remembered_id() {
        let mut store = MemoryStateStore::new();
        let token = suspend(&mut store, FlowState::new("src1").with_remembered_id("1"));
        let resumed = store.load(&token, &stage()).unwrap();

        let outcome = commit(
            &mut store,
            &source(),
            resumed,
            &SelectionAttempt::resolve(Some("42"), Some(&json!("1"))),
        )
        .unwrap();

        let Outcome::ReSuspended(suspension) = outcome else {
            panic!("expected re-suspension");
        };
        let reloaded = store.load(&suspension.state.token, &stage()).unwrap();
        assert_eq!(reloaded.state.remembered_id, Some(json!("1")));
    }
}
