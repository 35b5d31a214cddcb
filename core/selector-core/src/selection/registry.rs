//! Lookup of selection sources by the id stored on a suspended state.

use std::collections::HashMap;

use super::source::SelectionSource;

/// Maps source ids to their implementations.
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Box<dyn SelectionSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` under its own id, returning the source it replaced.
    pub fn register(
        &mut self,
        source: Box<dyn SelectionSource>,
    ) -> Option<Box<dyn SelectionSource>> {
        self.sources.insert(source.id().to_string(), source)
    }

    pub fn get(&self, source_id: &str) -> Option<&dyn SelectionSource> {
        self.sources.get(source_id).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
