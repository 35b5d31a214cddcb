//! Serialized state types shared by the stores and the selection pipeline.
//!
//! A [`FlowState`] is the payload the upstream engine suspends. Once it has
//! been loaded from a store it travels as a [`SuspendedState`], which pins the
//! token and stage it was loaded under.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::token;

/// Opaque handle for a suspended flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Mints a fresh random token.
    pub fn generate() -> Self {
        Token(token::generate())
    }

    /// Wraps a caller-supplied value. No shape check happens here; stores
    /// validate before loading.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Token(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tag naming the step of the flow that produced (or expects) a state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stage(String);

impl Stage {
    pub fn new(tag: impl Into<String>) -> Self {
        Stage(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure captured from a rejected selection, kept on the state so the
/// selection page can show it on the next render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitError {
    pub code: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl CommitError {
    pub fn new(code: impl Into<String>) -> Self {
        CommitError {
            code: code.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// Payload of a suspended flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    /// Selection source that owns this flow.
    pub source_id: String,
    #[serde(default)]
    pub error: Option<CommitError>,
    /// Prior choice carried by the upstream engine. Stored as raw JSON since
    /// producers may write numeric ids.
    #[serde(default)]
    pub remembered_id: Option<Value>,
    #[serde(default)]
    pub relying_party: Option<Value>,
    /// Opaque passthrough fields, forwarded to the renderer untouched.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl FlowState {
    pub fn new(source_id: impl Into<String>) -> Self {
        FlowState {
            source_id: source_id.into(),
            error: None,
            remembered_id: None,
            relying_party: None,
            metadata: Map::new(),
        }
    }

    pub fn with_remembered_id(mut self, id: impl Into<Value>) -> Self {
        self.remembered_id = Some(id.into());
        self
    }

    pub fn with_relying_party(mut self, metadata: Value) -> Self {
        self.relying_party = Some(metadata);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the state with `error` attached, replacing any previous one.
    pub fn with_error(mut self, error: CommitError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn without_error(mut self) -> Self {
        self.error = None;
        self
    }

    pub fn without_remembered_id(mut self) -> Self {
        self.remembered_id = None;
        self
    }
}

/// A [`FlowState`] as loaded from a store, pinned to its token and stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspendedState {
    pub token: Token,
    pub stage: Stage,
    pub state: FlowState,
}
