//! At-most-once deep-link requests.
//!
//! A host records "open this folder" from outside the vault's own
//! navigation (e.g. a client's directory entry). The layer that renders the
//! vault serves the request once and clears it, so re-renders do not keep
//! yanking the user back to the same folder.

use crate::error::Result;
use crate::models::NodeId;
use crate::store::Store;
use crate::tree::VaultTree;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pending: Option<NodeId>,
}

impl DeepLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request, replacing any unserved one.
    pub fn request(&mut self, folder_id: NodeId) {
        self.pending = Some(folder_id);
    }

    pub fn pending(&self) -> Option<&NodeId> {
        self.pending.as_ref()
    }

    /// Clear the request. Returns whether one was pending.
    pub fn complete(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Open the pending folder (full breadcrumb) and clear the request.
    ///
    /// The request is cleared even when the folder no longer exists; the
    /// lookup error is still returned. With nothing pending this is a no-op.
    pub fn serve<S: Store>(&mut self, tree: &mut VaultTree<S>) -> Result<Option<NodeId>> {
        let Some(folder_id) = self.pending.clone() else {
            return Ok(None);
        };

        let opened = tree.open_by_id_deep_link(&folder_id);
        self.complete();
        opened?;

        Ok(Some(folder_id))
    }
}
