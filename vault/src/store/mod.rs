//! Persistence for the vault's node collection.
//!
//! Stores hold a full snapshot: every save replaces whatever was there
//! before (last write wins). There is no incremental log.

mod json;

pub use json::JsonFileStore;

use crate::error::StoreError;
use crate::models::Node;

pub trait Store {
    /// Load the persisted collection. `None` means nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<Node>>, StoreError>;

    /// Replace the persisted collection with `nodes`, preserving order.
    fn save(&mut self, nodes: &[Node]) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn load(&self) -> Result<Option<Vec<Node>>, StoreError> {
        (**self).load()
    }

    fn save(&mut self, nodes: &[Node]) -> Result<(), StoreError> {
        (**self).save(nodes)
    }
}

/// In-process store, used for tests and for hosts that persist elsewhere.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    snapshot: Option<Vec<Node>>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        Self {
            snapshot: Some(nodes),
            saves: 0,
        }
    }

    pub fn snapshot(&self) -> Option<&[Node]> {
        self.snapshot.as_deref()
    }

    /// Number of saves since creation
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Option<Vec<Node>>, StoreError> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, nodes: &[Node]) -> Result<(), StoreError> {
        self.snapshot = Some(nodes.to_vec());
        self.saves += 1;
        Ok(())
    }
}
