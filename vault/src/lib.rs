//! Nyaya digital vault
//!
//! A folder/file hierarchy kept as a flat collection of nodes linked by
//! parent ids, with breadcrumb navigation, global search, subtree deletion,
//! storage accounting and pluggable snapshot persistence.

pub mod deep_link;
pub mod error;
pub mod legacy;
pub mod media;
pub mod models;
pub mod seed;
pub mod size;
pub mod store;
pub mod tree;

// Re-export commonly used types
pub use deep_link::DeepLink;
pub use error::{Result, StoreError, VaultError};
pub use media::MediaType;
pub use models::{Activation, ClientRef, Node, NodeId, NodeKind, Usage};
pub use store::{JsonFileStore, MemoryStore, Store};
pub use tree::{NamePolicy, VaultTree};

/// Storage limit used when the host does not configure one (2 GiB)
pub const DEFAULT_STORAGE_LIMIT: u64 = 2 * 1024 * 1024 * 1024;
