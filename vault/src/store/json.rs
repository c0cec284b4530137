use super::Store;
use crate::error::StoreError;
use crate::models::Node;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Node collection kept as a pretty-printed JSON array in a single file
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Node>>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let nodes: Vec<Node> = serde_json::from_str(&content)?;

        tracing::debug!("Loaded {} nodes from {}", nodes.len(), self.path.display());
        Ok(Some(nodes))
    }

    fn save(&mut self, nodes: &[Node]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_vec_pretty(nodes)?;

        // Write to a sibling temp file, then rename over the target
        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&content)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!("Saved {} nodes to {}", nodes.len(), self.path.display());
        Ok(())
    }
}
