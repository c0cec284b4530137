use crate::models::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Node not found: {0}")]
    NotFound(NodeId),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Corrupt vault: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, VaultError>;
