//! Selection sources: owners of the candidate list and of the accept/reject
//! decision for a selection.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{CommitError, Stage, Token};

/// Error code for an id that is not among the source's candidates.
pub const ERR_NOT_FOUND: &str = "NOTFOUND";
/// Error code for an id the source refuses to commit.
pub const ERR_NOT_ALLOWED: &str = "NOTALLOWED";

/// An identity the user may pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    /// Display attributes (name, mail, affiliation, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Candidate {
    pub fn new(id: impl Into<String>) -> Self {
        Candidate {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

pub trait SelectionSource: Send + Sync {
    fn id(&self) -> &str;

    /// Stage under which flows re-suspended by this source are saved.
    fn stage(&self) -> &Stage;

    fn candidates(&self) -> &[Candidate];

    /// Records `candidate_id` as the selection for the flow behind `token`.
    /// A rejection is returned as data so it can be shown to the user.
    fn attempt_commit(&self, token: &Token, candidate_id: &str) -> Result<(), CommitError>;
}

/// Source backed by a fixed candidate list, typically from configuration.
pub struct StaticSource {
    id: String,
    stage: Stage,
    candidates: Vec<Candidate>,
    denied: HashSet<String>,
}

impl StaticSource {
    pub fn new(id: impl Into<String>, stage: Stage, candidates: Vec<Candidate>) -> Self {
        StaticSource {
            id: id.into(),
            stage,
            candidates,
            denied: HashSet::new(),
        }
    }

    /// Ids that are listed but may not be selected.
    pub fn with_denied<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied.extend(ids.into_iter().map(Into::into));
        self
    }
}

impl SelectionSource for StaticSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn stage(&self) -> &Stage {
        &self.stage
    }

    fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    fn attempt_commit(&self, token: &Token, candidate_id: &str) -> Result<(), CommitError> {
        if self.denied.contains(candidate_id) {
            return Err(CommitError::new(ERR_NOT_ALLOWED).with_param("id", candidate_id));
        }

        if !self.candidates.iter().any(|c| c.id == candidate_id) {
            return Err(CommitError::new(ERR_NOT_FOUND).with_param("id", candidate_id));
        }

        tracing::debug!(
            source = %self.id,
            token = %token,
            candidate = %candidate_id,
            "Selection accepted"
        );
        Ok(())
    }
}
