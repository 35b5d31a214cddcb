//! Identity selection: request parsing, sources, and the resume/commit
//! pipeline.

mod registry;
mod request;
mod resolver;
mod source;
mod step;

pub use registry::SourceRegistry;
pub use request::{SelectionAttempt, SelectionRequest};
pub use resolver::{commit, resume, Completion, Outcome, Suspension};
pub use source::{Candidate, SelectionSource, StaticSource, ERR_NOT_ALLOWED, ERR_NOT_FOUND};
pub use step::{Interaction, SelectionStep, DEFAULT_FORM_ACTION};
