//! Identity selection step for a multi-stage authentication flow.
//!
//! An upstream identity-provider engine suspends its in-flight request as a
//! [`FlowState`] in a [`StateStore`] and sends the user here with the
//! resulting token. One interaction then:
//!
//! 1. resumes the state (`AuthState` token, checked for shape and stage),
//! 2. looks up the [`SelectionSource`] that owns the flow,
//! 3. picks the candidate id (request `id`, else the remembered id),
//! 4. commits it, or re-suspends the state with the rejection under a new
//!    token,
//! 5. returns either the completed state or a [`SelectionView`] to render.
//!
//! [`SelectionStep::handle`] runs all five; the individual steps are exposed
//! in [`selection`] for callers that need to compose them differently.

pub mod config;
pub mod cookie;
pub mod error;
pub mod render;
pub mod selection;
pub mod state;

pub use config::{load_config, SelectorConfig};
pub use cookie::{CookieJar, CookieWriter, RememberCookie};
pub use error::{ResumeError, SelectError};
pub use render::{JsonRenderer, Renderer, SelectionView};
pub use selection::{
    Candidate, Completion, Interaction, SelectionRequest, SelectionSource, SelectionStep,
    SourceRegistry, StaticSource,
};
pub use state::{
    CommitError, FileStateStore, FlowState, MemoryStateStore, Stage, StateStore, SuspendedState,
    Token,
};
