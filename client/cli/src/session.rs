//! One CLI invocation's view of the vault.
//!
//! Opens the configured store, seeds it on first use, restores the
//! breadcrumb the previous command left behind and serves any pending
//! deep link. Commands mutate `tree` and call [`Session::close`].

use crate::config::{Backend, Config};
use crate::db::{LocalDb, SqliteStore};
use nyaya_vault::seed::default_topology;
use nyaya_vault::{DeepLink, JsonFileStore, Node, NodeId, Store, VaultTree};
use std::path::Path;
use std::sync::Arc;

pub type DynStore = Box<dyn Store>;

pub struct Session {
    pub tree: VaultTree<DynStore>,
    db: Arc<LocalDb>,
}

impl Session {
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let db = Arc::new(LocalDb::open(&config.db_path()?)?);
        let store: DynStore = match config.backend {
            Backend::Sqlite => Box::new(SqliteStore::new(Arc::clone(&db))),
            Backend::Json => Box::new(JsonFileStore::new(config.json_path()?)),
        };
        Self::with_store(config, db, store)
    }

    fn with_store(config: &Config, db: Arc<LocalDb>, store: DynStore) -> anyhow::Result<Self> {
        let tree = VaultTree::open_or_seed(store, default_topology(&config.clients))?
            .with_name_policy(config.name_policy());
        let mut session = Self { tree, db };

        let saved = session.db.load_cwd()?;
        session.tree.restore_path(&saved);
        session.serve_deep_link()?;
        Ok(session)
    }

    /// Serve a deep link left by `client open`. The request is consumed even
    /// when its folder has since been deleted.
    fn serve_deep_link(&mut self) -> anyhow::Result<()> {
        let Some(folder_id) = self.db.pending_deep_link()? else {
            return Ok(());
        };

        let mut link = DeepLink::new();
        link.request(folder_id.clone());
        let served = link.serve(&mut self.tree);
        self.db.clear_deep_link()?;

        if let Err(e) = served {
            tracing::warn!("Dropped deep link to {}: {}", folder_id, e);
        }
        Ok(())
    }

    pub fn request_deep_link(&self, folder_id: &NodeId) -> anyhow::Result<()> {
        self.db.request_deep_link(folder_id)
    }

    /// Replace the whole collection (reset or import) and persist it.
    pub fn replace(&mut self, nodes: Vec<Node>) -> anyhow::Result<()> {
        let policy = self.tree.name_policy();
        let store = std::mem::replace(&mut self.tree, VaultTree::new(placeholder()))
            .into_store();
        self.tree = VaultTree::from_nodes(nodes, store)?.with_name_policy(policy);
        self.tree.flush()?;
        Ok(())
    }

    /// Resolve a command-line argument to a node: an exact id first, then
    /// a unique name among the active folder's entries.
    pub fn resolve(&self, arg: &str) -> anyhow::Result<NodeId> {
        let id = NodeId::from(arg);
        if self.tree.get(&id).is_some() {
            return Ok(id);
        }

        let matches: Vec<&Node> = self
            .tree
            .list_current(None)
            .into_iter()
            .filter(|n| n.name == arg)
            .collect();
        match matches.as_slice() {
            [node] => Ok(node.id.clone()),
            [] => anyhow::bail!("No entry with id or name '{}'", arg),
            _ => anyhow::bail!("'{}' is ambiguous here; use the id", arg),
        }
    }

    /// Save the breadcrumb for the next command and surface store errors.
    pub fn close(mut self) -> anyhow::Result<()> {
        self.save_cwd()?;
        self.tree.flush()?;
        Ok(())
    }

    pub fn save_cwd(&self) -> anyhow::Result<()> {
        self.db.save_cwd(self.tree.current_path())
    }

    #[cfg(test)]
    pub fn open_memory(config: &Config) -> anyhow::Result<Self> {
        let db = Arc::new(LocalDb::open_memory()?);
        let store: DynStore = Box::new(SqliteStore::new(Arc::clone(&db)));
        Self::with_store(config, db, store)
    }

    #[cfg(test)]
    fn reopen(self, config: &Config) -> anyhow::Result<Self> {
        self.save_cwd()?;
        let store: DynStore = Box::new(SqliteStore::new(Arc::clone(&self.db)));
        Self::with_store(config, self.db, store)
    }
}

fn placeholder() -> DynStore {
    Box::new(nyaya_vault::MemoryStore::new())
}

/// `file://` URL for a local path, percent-encoding anything outside the
/// unreserved set.
pub fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let mut url = String::from("file://");
    if !raw.starts_with('/') {
        url.push('/');
    }
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' | b':' => {
                url.push(byte as char)
            }
            _ => url.push_str(&format!("%{:02X}", byte)),
        }
    }
    url
}
