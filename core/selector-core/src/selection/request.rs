//! Inbound parameters and candidate id extraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ResumeError;

/// Query parameters of one selection interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    #[serde(rename = "AuthState", default)]
    pub auth_state: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl SelectionRequest {
    pub fn new(auth_state: impl Into<String>) -> Self {
        SelectionRequest {
            auth_state: Some(auth_state.into()),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Parses a URL query string such as `AuthState=_ab12...&id=7`. A leading
    /// `?` is accepted. Unknown parameters are ignored.
    pub fn from_query(query: &str) -> Result<Self, ResumeError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        serde_urlencoded::from_str(query)
            .map_err(|e| ResumeError::BadRequest(format!("Malformed query string: {}", e)))
    }
}

/// The candidate id a single interaction will try to commit.
///
/// An empty id means the user has not chosen yet; it is never committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionAttempt {
    pub candidate_id: String,
}

impl SelectionAttempt {
    /// Applies the precedence: request parameter, then the id remembered on
    /// the state, then empty. A request value that is blank after trimming
    /// counts as absent.
    pub fn resolve(requested: Option<&str>, remembered: Option<&Value>) -> Self {
        let candidate_id = requested
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| remembered.and_then(coerce_stored_id))
            .unwrap_or_default();

        SelectionAttempt { candidate_id }
    }

    pub fn is_empty(&self) -> bool {
        self.candidate_id.is_empty()
    }
}

fn coerce_stored_id(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!id.is_empty()).then_some(id)
}
