//! Errors that end an interaction without producing a selection page.
//!
//! Rejected selections are not errors at this level: they are captured on the
//! state and re-rendered (see [`crate::selection::commit`]).

use thiserror::Error;

use crate::render::RenderError;
use crate::state::{LoadError, Stage, StoreError};

/// Failures of the resume gate. All of these are caller errors except
/// [`ResumeError::Store`].
#[derive(Error, Debug)]
pub enum ResumeError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid AuthState token")]
    InvalidToken,

    #[error("No suspended state found for AuthState token")]
    StateNotFound,

    #[error("Suspended state belongs to stage '{found}', expected '{expected}'")]
    StageMismatch { expected: Stage, found: Stage },

    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}

impl From<LoadError> for ResumeError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::NotFound => ResumeError::StateNotFound,
            LoadError::StageMismatch { expected, found } => {
                ResumeError::StageMismatch { expected, found }
            }
            LoadError::Store(e) => ResumeError::Store(e),
        }
    }
}

#[derive(Error, Debug)]
pub enum SelectError {
    #[error(transparent)]
    Resume(#[from] ResumeError),

    /// The suspended state names a source that is not registered. This points
    /// at stale or corrupted state, never at user input.
    #[error("Selection source '{source_id}' is not registered")]
    SourceNotRegistered { source_id: String },

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

impl SelectError {
    /// True for failures that are defects rather than caller mistakes.
    pub fn is_internal(&self) -> bool {
        match self {
            SelectError::Resume(ResumeError::Store(_)) => true,
            SelectError::Resume(_) => false,
            SelectError::SourceNotRegistered { .. }
            | SelectError::Store(_)
            | SelectError::Render(_) => true,
        }
    }

    /// HTTP status an HTTP boundary should answer with.
    pub fn status_code(&self) -> u16 {
        if self.is_internal() {
            500
        } else {
            400
        }
    }
}
