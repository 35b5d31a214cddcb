//! Suspended flow state: tokens, stages and the stores that hold them.

mod store;
mod token;
mod types;

pub use store::{
    FileStateStore, LoadError, MemoryStateStore, StateStore, StoreError, DEFAULT_STATE_TTL_SECS,
};
pub use token::is_well_formed;
pub use types::{CommitError, FlowState, Stage, SuspendedState, Token};
