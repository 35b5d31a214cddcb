//! Data handed to the selection page, and the seam to whatever renders it.
//!
//! [`assemble_view`] is the only place presentation data is built. It copies
//! what the page needs out of the source and the state; it makes no
//! decisions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::selection::{Candidate, SelectionSource, ERR_NOT_ALLOWED, ERR_NOT_FOUND};
use crate::state::{SuspendedState, Token};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to encode form target: {0}")]
    FormTarget(#[from] serde_urlencoded::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorText {
    pub title: String,
    pub description: String,
}

impl ErrorText {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        ErrorText {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Known error codes and their user-facing text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorCatalog(BTreeMap<String, ErrorText>);

impl Default for ErrorCatalog {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            ERR_NOT_FOUND.to_string(),
            ErrorText::new(
                "Unknown identity",
                "The selected identity is not available for this login.",
            ),
        );
        entries.insert(
            ERR_NOT_ALLOWED.to_string(),
            ErrorText::new(
                "Identity not allowed",
                "You are not permitted to continue with the selected identity.",
            ),
        );
        ErrorCatalog(entries)
    }
}

impl ErrorCatalog {
    pub fn empty() -> Self {
        ErrorCatalog(BTreeMap::new())
    }

    /// Returns the catalog with `overrides` added, replacing entries with the
    /// same code.
    pub fn merged(mut self, overrides: &BTreeMap<String, ErrorText>) -> Self {
        for (code, text) in overrides {
            self.0.insert(code.clone(), text.clone());
        }
        self
    }

    pub fn get(&self, code: &str) -> Option<&ErrorText> {
        self.0.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains_key(code)
    }
}

/// Everything the selection page is rendered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionView {
    pub candidates: Vec<Candidate>,
    /// Form submission URL, already carrying the current token.
    pub form_target: String,
    pub auth_state: Token,
    pub error_code: Option<String>,
    pub error_params: Option<Map<String, Value>>,
    pub error_catalog: ErrorCatalog,
    /// Serialized as `null` when the flow carries no relying-party metadata.
    pub relying_party: Option<Value>,
    pub metadata: Map<String, Value>,
    pub preselected: Option<String>,
}

/// Appends `AuthState=<token>` to `action`.
pub fn form_target(action: &str, token: &Token) -> Result<String, RenderError> {
    let query = serde_urlencoded::to_string([("AuthState", token.as_str())])?;
    let separator = if action.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}{}", action, separator, query))
}

pub fn assemble_view(
    source: &dyn SelectionSource,
    suspended: &SuspendedState,
    form_action: &str,
    catalog: &ErrorCatalog,
    preselected: Option<&str>,
) -> Result<SelectionView, RenderError> {
    let error = suspended.state.error.as_ref();

    Ok(SelectionView {
        candidates: source.candidates().to_vec(),
        form_target: form_target(form_action, &suspended.token)?,
        auth_state: suspended.token.clone(),
        error_code: error.map(|e| e.code.clone()),
        error_params: error.map(|e| e.params.clone()),
        error_catalog: catalog.clone(),
        relying_party: suspended.state.relying_party.clone(),
        metadata: suspended.state.metadata.clone(),
        preselected: preselected
            .filter(|id| !id.is_empty())
            .map(str::to_string),
    })
}

/// Turns a [`SelectionView`] into a response body.
pub trait Renderer {
    fn render(&self, view: &SelectionView) -> Result<String, RenderError>;
}

/// Renders the view as pretty-printed JSON, for API clients and tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, view: &SelectionView) -> Result<String, RenderError> {
        Ok(serde_json::to_string_pretty(view)?)
    }
}
