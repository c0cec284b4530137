//! VaultTree: a folder/file tree stored as a flat, parent-pointer collection.
//!
//! Nodes live in one map keyed by id. A children index (parent id -> child
//! ids) is kept in step with every mutation so listings and subtree walks
//! never scan the whole collection. `order` remembers insertion order, which
//! is the order every listing is returned in.

use crate::error::{Result, VaultError};
use crate::media::MediaType;
use crate::models::{Activation, ClientRef, Node, NodeId, NodeKind, Usage, JUST_NOW};
use crate::seed::CLIENTS_FOLDER_ID;
use crate::size::{format_bytes, parse_size_label};
use crate::store::{MemoryStore, Store};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// Whether two siblings may share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    #[default]
    AllowDuplicates,
    UniquePerFolder,
}

pub struct VaultTree<S = MemoryStore> {
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    children: HashMap<Option<NodeId>, Vec<NodeId>>,
    /// Breadcrumb from the root to the active folder; empty at root
    current_path: Vec<NodeId>,
    store: S,
    name_policy: NamePolicy,
}

impl<S: Store> VaultTree<S> {
    /// Empty vault on top of `store`. Nothing is written until the first mutation.
    pub fn new(store: S) -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            children: HashMap::new(),
            current_path: Vec::new(),
            store,
            name_policy: NamePolicy::default(),
        }
    }

    /// Load whatever `store` holds; an empty store gives an empty vault.
    pub fn open(store: S) -> Result<Self> {
        match store.load()? {
            Some(nodes) => Self::from_nodes(nodes, store),
            None => Ok(Self::new(store)),
        }
    }

    /// Load `store`, or persist `seed` into it if it has never been written.
    pub fn open_or_seed(store: S, seed: Vec<Node>) -> Result<Self> {
        match store.load()? {
            Some(nodes) => Self::from_nodes(nodes, store),
            None => {
                let mut tree = Self::from_nodes(seed, store)?;
                tracing::info!("Seeded vault with {} nodes", tree.len());
                tree.persist();
                Ok(tree)
            }
        }
    }

    /// Build a tree from a collection, rejecting anything that breaks the
    /// tree invariants (duplicate ids, dangling or non-folder parents, cycles).
    pub fn from_nodes(nodes: Vec<Node>, store: S) -> Result<Self> {
        let mut tree = Self::new(store);

        for node in nodes {
            if tree.nodes.contains_key(&node.id) {
                return Err(VaultError::Corrupt(format!("duplicate node id {}", node.id)));
            }
            tree.insert(node);
        }

        for id in &tree.order {
            let node = &tree.nodes[id];
            if let Some(parent_id) = &node.parent_id {
                match tree.nodes.get(parent_id) {
                    Some(parent) if parent.is_folder() => {}
                    Some(_) => {
                        return Err(VaultError::Corrupt(format!(
                            "{} has a file ({}) as parent",
                            id, parent_id
                        )))
                    }
                    None => {
                        return Err(VaultError::Corrupt(format!(
                            "{} references missing parent {}",
                            id, parent_id
                        )))
                    }
                }
            }
        }

        for id in &tree.order {
            if tree.reaches_root(id).is_none() {
                return Err(VaultError::Corrupt(format!("{} is part of a cycle", id)));
            }
        }

        Ok(tree)
    }

    pub fn with_name_policy(mut self, policy: NamePolicy) -> Self {
        self.name_policy = policy;
        self
    }

    pub fn name_policy(&self) -> NamePolicy {
        self.name_policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give the store back, e.g. to rebuild the vault from a new collection.
    pub fn into_store(self) -> S {
        self.store
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Owned copy of the collection, in the order it is persisted.
    pub fn snapshot(&self) -> Vec<Node> {
        self.nodes().cloned().collect()
    }

    /// Direct children of `parent` (`None` = root), in insertion order.
    pub fn children_of(&self, parent: Option<&NodeId>) -> Vec<&Node> {
        self.children
            .get(&parent.cloned())
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn current_folder_id(&self) -> Option<&NodeId> {
        self.current_path.last()
    }

    pub fn current_path(&self) -> &[NodeId] {
        &self.current_path
    }

    /// Nodes of the current path, root-most first
    pub fn breadcrumbs(&self) -> Vec<&Node> {
        self.current_path
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Listing for the active view.
    ///
    /// A non-empty `query` switches to global search: every node whose name
    /// contains it (case-insensitive), regardless of the active folder.
    /// Otherwise exactly the children of the active folder are returned.
    pub fn list_current(&self, query: Option<&str>) -> Vec<&Node> {
        match query {
            Some(q) if !q.is_empty() => self.search(q),
            _ => self.children_of(self.current_folder_id()),
        }
    }

    pub fn search(&self, query: &str) -> Vec<&Node> {
        let needle = query.to_lowercase();
        self.nodes()
            .filter(|node| node.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Ancestors of `id`, root-most first, not including `id` itself.
    pub fn ancestors(&self, id: &NodeId) -> Result<Vec<&Node>> {
        let node = self.require(id)?;

        let mut chain = Vec::new();
        let mut cursor = node.parent_id.as_ref();
        while let Some(parent_id) = cursor {
            if chain.len() > self.nodes.len() {
                return Err(VaultError::Corrupt(format!("{} is part of a cycle", id)));
            }
            let parent = self.require(parent_id)?;
            chain.push(parent);
            cursor = parent.parent_id.as_ref();
        }

        chain.reverse();
        Ok(chain)
    }

    /// Every node below `id` (pre-order), not including `id` itself.
    pub fn descendants(&self, id: &NodeId) -> Vec<&Node> {
        self.subtree_ids(id)
            .into_iter()
            .skip(1)
            .filter_map(|id| self.nodes.get(&id))
            .collect()
    }

    /// Aggregate size of all files, against a storage limit.
    pub fn compute_usage(&self, limit_bytes: u64) -> Usage {
        let used: f64 = self
            .nodes()
            .filter_map(|node| node.size_label())
            .map(parse_size_label)
            .sum();
        let used_bytes = used.round() as u64;

        let percent_of_limit = if limit_bytes == 0 {
            if used_bytes > 0 {
                100.0
            } else {
                0.0
            }
        } else {
            (used_bytes as f64 / limit_bytes as f64 * 100.0).min(100.0)
        };

        Usage {
            used_bytes,
            used_label: format_bytes(used_bytes),
            limit_bytes,
            limit_label: format_bytes(limit_bytes),
            percent_of_limit,
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn navigate_into(&mut self, folder_id: &NodeId) -> Result<()> {
        self.require_folder(folder_id)?;
        self.current_path.push(folder_id.clone());
        Ok(())
    }

    pub fn navigate_up(&mut self) {
        self.current_path.pop();
    }

    /// Keep the breadcrumb up to and including position `index`.
    pub fn navigate_to_breadcrumb(&mut self, index: usize) {
        self.current_path.truncate(index.saturating_add(1));
    }

    pub fn navigate_to_root(&mut self) {
        self.current_path.clear();
    }

    /// Jump straight to a folder, rebuilding the full breadcrumb from the root.
    pub fn open_by_id_deep_link(&mut self, folder_id: &NodeId) -> Result<()> {
        self.require_folder(folder_id)?;

        let mut path: Vec<NodeId> = self
            .ancestors(folder_id)?
            .into_iter()
            .map(|node| node.id.clone())
            .collect();
        path.push(folder_id.clone());

        tracing::debug!("Deep link to {} ({} levels)", folder_id, path.len());
        self.current_path = path;
        Ok(())
    }

    /// Restore a saved breadcrumb, keeping the longest prefix that is still
    /// a real chain: a top-level folder first, then each entry a child
    /// folder of the one before. Returns how many entries were kept.
    pub fn restore_path(&mut self, ids: &[NodeId]) -> usize {
        let mut kept: Vec<NodeId> = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(node) = self.nodes.get(id) else {
                break;
            };
            if !node.is_folder() || node.parent_id.as_ref() != kept.last() {
                break;
            }
            kept.push(id.clone());
        }
        self.current_path = kept;

        if self.current_path.len() != ids.len() {
            tracing::debug!(
                "Restored {} of {} breadcrumb entries",
                self.current_path.len(),
                ids.len()
            );
        }
        self.current_path.len()
    }

    /// Open an entry the way a click in the listing does: folders are
    /// entered, files are handed back for preview or selection.
    pub fn activate(&mut self, id: &NodeId) -> Result<Activation> {
        let node = self.require(id)?;
        if node.is_folder() {
            self.navigate_into(id)?;
            Ok(Activation::Navigated(id.clone()))
        } else {
            Ok(Activation::Selected(node.clone()))
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a folder inside the active folder.
    pub fn create_folder(&mut self, name: &str) -> Result<Node> {
        let name = validate_name(name, "folder name")?;
        let parent_id = self.current_folder_id().cloned();
        self.check_sibling_name(parent_id.as_ref(), name, None)?;

        let mut folder = Node::folder(NodeId::generate("folder"), parent_id, name, JUST_NOW);
        folder.created_at = Some(Utc::now());

        tracing::debug!("Created folder {} ({})", folder.id, folder.name);
        self.insert(folder.clone());
        self.persist();
        Ok(folder)
    }

    /// Add a file inside the active folder. The media type comes from the
    /// name's extension and the size is stored as a label.
    pub fn add_file(
        &mut self,
        name: &str,
        size_bytes: u64,
        content_ref: Option<String>,
    ) -> Result<Node> {
        let name = validate_name(name, "file name")?;
        let parent_id = self.current_folder_id().cloned();
        self.check_sibling_name(parent_id.as_ref(), name, None)?;

        let mut file = Node::file(
            NodeId::generate("file"),
            parent_id,
            name,
            MediaType::from_file_name(name),
            format_bytes(size_bytes),
            content_ref,
            JUST_NOW,
        );
        file.created_at = Some(Utc::now());

        tracing::debug!("Added file {} ({}, {} bytes)", file.id, file.name, size_bytes);
        self.insert(file.clone());
        self.persist();
        Ok(file)
    }

    /// Give a client its folder under the "Clients" root.
    pub fn register_client_folder(&mut self, client: &ClientRef) -> Result<Node> {
        let name = validate_name(&client.name, "client name")?;
        let clients_root = NodeId::from(CLIENTS_FOLDER_ID);
        self.require_folder(&clients_root)?;

        let id = client.vault_folder_id();
        if self.nodes.contains_key(&id) {
            return Err(VaultError::Conflict(format!("node {} already exists", id)));
        }
        self.check_sibling_name(Some(&clients_root), name, None)?;

        let mut folder = Node::folder(id, Some(clients_root), name, JUST_NOW);
        folder.created_at = Some(Utc::now());

        tracing::debug!("Registered client folder {} for {}", folder.id, client.id);
        self.insert(folder.clone());
        self.persist();
        Ok(folder)
    }

    pub fn rename_node(&mut self, id: &NodeId, name: &str) -> Result<()> {
        let name = validate_name(name, "name")?;
        let parent_id = self.require(id)?.parent_id.clone();
        self.check_sibling_name(parent_id.as_ref(), name, Some(id))?;

        if let Some(node) = self.nodes.get_mut(id) {
            node.name = name.to_string();
        }

        tracing::debug!("Renamed {} to {}", id, name);
        self.persist();
        Ok(())
    }

    /// Re-parent a node (`None` = root). The moved node is re-appended to
    /// the collection. Moving a folder into its own subtree is rejected.
    pub fn move_node(&mut self, id: &NodeId, new_parent: Option<&NodeId>) -> Result<()> {
        let node = self.require(id)?;
        if node.parent_id.as_ref() == new_parent {
            return Ok(());
        }
        let name = node.name.clone();

        if let Some(target) = new_parent {
            self.require_folder(target)?;
            if self.subtree_ids(id).contains(target) {
                return Err(VaultError::Conflict(format!(
                    "cannot move {} into its own subtree",
                    id
                )));
            }
        }
        self.check_sibling_name(new_parent, &name, Some(id))?;

        let old_parent = self.nodes[id].parent_id.clone();
        self.detach(id, old_parent);
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = new_parent.cloned();
        }
        self.order.push(id.clone());
        self.children
            .entry(new_parent.cloned())
            .or_default()
            .push(id.clone());

        // The breadcrumb through a moved folder follows it to its new place
        if let Some(pos) = self.current_path.iter().position(|x| x == id) {
            let mut path = self.path_to(id);
            path.extend(self.current_path.drain(pos + 1..));
            self.current_path = path;
        }

        tracing::debug!(
            "Moved {} to {}",
            id,
            new_parent.map(NodeId::as_str).unwrap_or("<root>")
        );
        self.persist();
        Ok(())
    }

    /// Delete a node together with everything below it.
    ///
    /// Returns the removed nodes; an unknown id removes nothing. If the
    /// active breadcrumb passed through a removed folder it is cut back to
    /// the last surviving entry.
    pub fn delete_node(&mut self, id: &NodeId) -> Vec<Node> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let parent_id = node.parent_id.clone();

        let doomed = self.subtree_ids(id);
        let doomed_set: HashSet<&NodeId> = doomed.iter().collect();

        self.detach(id, parent_id);
        for removed in &doomed {
            self.children.remove(&Some(removed.clone()));
        }
        self.order.retain(|x| !doomed_set.contains(x));

        if let Some(cut) = self
            .current_path
            .iter()
            .position(|x| doomed_set.contains(x))
        {
            self.current_path.truncate(cut);
        }

        let removed: Vec<Node> = doomed
            .iter()
            .filter_map(|x| self.nodes.remove(x))
            .collect();

        tracing::debug!("Deleted {} ({} nodes)", id, removed.len());
        self.persist();
        removed
    }

    /// Persist the collection now, surfacing any store error.
    pub fn flush(&mut self) -> Result<()> {
        let snapshot = self.snapshot();
        self.store.save(&snapshot)?;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Best-effort save after a mutation. The in-memory tree stays
    /// authoritative when the store fails.
    fn persist(&mut self) {
        let snapshot = self.snapshot();
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!("Failed to persist vault ({} nodes): {}", snapshot.len(), e);
        }
    }

    fn insert(&mut self, node: Node) {
        self.children
            .entry(node.parent_id.clone())
            .or_default()
            .push(node.id.clone());
        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
    }

    /// Unlink `id` from its parent's child list and from `order`.
    fn detach(&mut self, id: &NodeId, parent_id: Option<NodeId>) {
        if let Some(siblings) = self.children.get_mut(&parent_id) {
            siblings.retain(|x| x != id);
            if siblings.is_empty() {
                self.children.remove(&parent_id);
            }
        }
        self.order.retain(|x| x != id);
    }

    /// `id` followed by all of its descendants, pre-order.
    fn subtree_ids(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(id) {
            return out;
        }

        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(kids) = self.children.get(&Some(current.clone())) {
                stack.extend(kids.iter().rev().cloned());
            }
            out.push(current);
        }
        out
    }

    /// Ids from the top level down to and including `id`.
    fn path_to(&self, id: &NodeId) -> Vec<NodeId> {
        let mut path = vec![id.clone()];
        let mut cursor = self.nodes.get(id).and_then(|n| n.parent_id.as_ref());
        while let Some(parent_id) = cursor {
            if path.len() > self.nodes.len() {
                break;
            }
            path.push(parent_id.clone());
            cursor = self.nodes.get(parent_id).and_then(|n| n.parent_id.as_ref());
        }
        path.reverse();
        path
    }

    /// Depth of `id` if its parent chain ends at the root within `len` steps.
    fn reaches_root(&self, id: &NodeId) -> Option<usize> {
        let mut depth = 0;
        let mut cursor = self.nodes.get(id)?.parent_id.as_ref();
        while let Some(parent_id) = cursor {
            depth += 1;
            if depth > self.nodes.len() {
                return None;
            }
            cursor = self.nodes.get(parent_id)?.parent_id.as_ref();
        }
        Some(depth)
    }

    fn require(&self, id: &NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| VaultError::NotFound(id.clone()))
    }

    fn require_folder(&self, id: &NodeId) -> Result<&Node> {
        match self.nodes.get(id) {
            Some(node) if matches!(node.kind, NodeKind::Folder) => Ok(node),
            _ => Err(VaultError::NotFound(id.clone())),
        }
    }

    fn check_sibling_name(
        &self,
        parent: Option<&NodeId>,
        name: &str,
        except: Option<&NodeId>,
    ) -> Result<()> {
        if self.name_policy == NamePolicy::AllowDuplicates {
            return Ok(());
        }

        let clash = self
            .children_of(parent)
            .into_iter()
            .any(|sibling| Some(&sibling.id) != except && sibling.name == name);
        if clash {
            return Err(VaultError::Conflict(format!(
                "'{}' already exists in this folder",
                name
            )));
        }
        Ok(())
    }
}

fn validate_name<'a>(name: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(VaultError::InvalidArgument(format!("{} cannot be empty", what)));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::seed::default_topology;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn empty() -> VaultTree {
        VaultTree::new(MemoryStore::new())
    }

    pub(super) fn seeded() -> VaultTree {
        let clients = vec![
            ClientRef::new("C001", "Dream Infrastructure & Developers"),
            ClientRef::new("C002", "Rahul Naresh Puglia"),
        ];
        VaultTree::from_nodes(default_topology(&clients), MemoryStore::new()).unwrap()
    }

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn names(nodes: &[&Node]) -> Vec<String> {
        nodes.iter().map(|n| n.name.clone()).collect()
    }

    /// Every parent pointer resolves to a folder and the index agrees with the map.
    pub(super) fn assert_well_formed<S: Store>(tree: &VaultTree<S>) {
        for node in tree.nodes() {
            if let Some(parent_id) = &node.parent_id {
                let parent = tree.get(parent_id).unwrap_or_else(|| {
                    panic!("{} has dangling parent {}", node.id, parent_id)
                });
                assert!(parent.is_folder(), "{} has a file as parent", node.id);
            }
            assert!(
                tree.children_of(node.parent_id.as_ref())
                    .iter()
                    .any(|n| n.id == node.id),
                "{} missing from children index",
                node.id
            );
        }
        let indexed: usize = tree.children.values().map(Vec::len).sum();
        assert_eq!(indexed, tree.len());
    }

    /// The breadcrumb starts at a top-level folder and each entry is a
    /// child folder of the previous one.
    pub(super) fn assert_breadcrumb_is_chain<S: Store>(tree: &VaultTree<S>) {
        let mut parent: Option<&NodeId> = None;
        for entry in tree.current_path() {
            let node = tree
                .get(entry)
                .unwrap_or_else(|| panic!("breadcrumb holds missing {}", entry));
            assert!(node.is_folder(), "breadcrumb holds file {}", entry);
            assert_eq!(node.parent_id.as_ref(), parent, "breadcrumb breaks at {}", entry);
            parent = Some(entry);
        }
    }

    struct FailingStore;

    impl Store for FailingStore {
        fn load(&self) -> std::result::Result<Option<Vec<Node>>, StoreError> {
            Ok(None)
        }

        fn save(&mut self, _nodes: &[Node]) -> std::result::Result<(), StoreError> {
            Err(StoreError::Backend("disk full".to_string()))
        }
    }

    #[test]
    fn test_create_folder_at_root() {
        let mut tree = empty();
        let folder = tree.create_folder("Litigation").unwrap();

        assert!(folder.is_folder());
        assert_eq!(folder.parent_id, None);
        assert_eq!(folder.created_label, "Just now");
        assert!(folder.created_at.is_some());

        let listing = tree.list_current(None);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "Litigation");
        assert_eq!(listing[0].parent_id, None);
    }

    #[test]
    fn test_create_folder_rejects_blank_name() {
        let mut tree = empty();
        for name in ["", "   ", "\t\n"] {
            match tree.create_folder(name) {
                Err(VaultError::InvalidArgument(_)) => (),
                other => panic!("expected InvalidArgument, got {:?}", other),
            }
        }
        assert!(tree.is_empty());
        assert_eq!(tree.store().saves(), 0);
    }

    #[test]
    fn test_create_folder_trims_name() {
        let mut tree = empty();
        let folder = tree.create_folder("  Appeals ").unwrap();
        assert_eq!(folder.name, "Appeals");
    }

    #[test]
    fn test_create_folder_inside_active_folder() {
        let mut tree = seeded();
        tree.navigate_into(&id("root-3")).unwrap();
        let folder = tree.create_folder("IPC").unwrap();
        assert_eq!(folder.parent_id, Some(id("root-3")));
        assert_eq!(names(&tree.list_current(None)), vec!["IPC"]);
    }

    #[test]
    fn test_add_file_classifies_and_formats() {
        let mut tree = empty();
        let file = tree.add_file("Brief.pdf", 1_300_000, None).unwrap();

        assert!(file.is_file());
        assert_eq!(file.media_type(), Some(MediaType::Pdf));
        assert_eq!(file.size_label(), Some("1.24 MB"));
        assert_eq!(file.content_ref(), None);
        assert!(file.id.as_str().starts_with("file-"));
    }

    #[test]
    fn test_add_file_keeps_content_ref() {
        let mut tree = seeded();
        tree.navigate_into(&id("root-4")).unwrap();
        let file = tree
            .add_file(
                "Bail_Template.docx",
                24 * 1024,
                Some("file:///home/adv/Bail_Template.docx".to_string()),
            )
            .unwrap();

        assert_eq!(file.parent_id, Some(id("root-4")));
        assert_eq!(file.media_type(), Some(MediaType::Doc));
        assert_eq!(file.size_label(), Some("24 KB"));
        assert_eq!(file.content_ref(), Some("file:///home/adv/Bail_Template.docx"));
    }

    #[test]
    fn test_add_file_rejects_blank_name() {
        let mut tree = empty();
        assert!(matches!(
            tree.add_file(" ", 10, None),
            Err(VaultError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_list_current_is_exactly_children() {
        let mut tree = seeded();
        tree.navigate_into(&id("root-1")).unwrap();
        tree.create_folder("Closed Matters").unwrap();
        tree.navigate_to_root();
        tree.create_folder("Scratch").unwrap();

        tree.navigate_into(&id("root-1")).unwrap();
        let listing = tree.list_current(None);
        assert_eq!(
            names(&listing),
            vec![
                "Dream Infrastructure & Developers",
                "Rahul Naresh Puglia",
                "Closed Matters"
            ]
        );
        assert!(listing
            .iter()
            .all(|n| n.parent_id.as_ref() == Some(&id("root-1"))));

        tree.navigate_to_root();
        assert_eq!(
            names(&tree.list_current(Some(""))),
            vec![
                "Clients",
                "Judgments Library",
                "Bare Acts",
                "Draft Templates",
                "Scratch"
            ]
        );
    }

    #[test]
    fn test_search_is_global_and_case_insensitive() {
        let mut tree = seeded();
        tree.navigate_into(&id("client-C001")).unwrap();
        tree.add_file("Writ_Petition.pdf", 2048, None).unwrap();
        tree.navigate_into(&id("root-2")).unwrap();

        let hits = tree.list_current(Some("PETITION"));
        assert_eq!(names(&hits), vec!["Writ_Petition.pdf"]);

        let hits = tree.list_current(Some("a"));
        assert!(hits.len() > tree.list_current(None).len());
        assert!(tree.list_current(Some("no such thing")).is_empty());
    }

    #[test]
    fn test_navigate_into_then_up_restores_path() {
        let mut tree = seeded();
        tree.navigate_into(&id("root-1")).unwrap();
        let before = tree.current_path().to_vec();

        tree.navigate_into(&id("client-C002")).unwrap();
        assert_eq!(tree.current_folder_id(), Some(&id("client-C002")));

        tree.navigate_up();
        assert_eq!(tree.current_path(), before.as_slice());
    }

    #[test]
    fn test_navigate_into_rejects_missing_and_files() {
        let mut tree = seeded();
        tree.navigate_into(&id("client-C001")).unwrap();
        let file = tree.add_file("Vakalatnama.pdf", 1000, None).unwrap();
        let before = tree.current_path().to_vec();

        assert!(matches!(
            tree.navigate_into(&id("nope")),
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            tree.navigate_into(&file.id),
            Err(VaultError::NotFound(_))
        ));
        assert_eq!(tree.current_path(), before.as_slice());
    }

    #[test]
    fn test_navigate_up_at_root_is_noop() {
        let mut tree = seeded();
        tree.navigate_up();
        assert!(tree.current_path().is_empty());
    }

    #[test]
    fn test_navigate_to_breadcrumb_and_root() {
        let mut tree = seeded();
        tree.navigate_into(&id("root-1")).unwrap();
        tree.navigate_into(&id("client-C001")).unwrap();
        let deep = tree.create_folder("2025").unwrap();
        tree.navigate_into(&deep.id).unwrap();
        assert_eq!(tree.current_path().len(), 3);

        tree.navigate_to_breadcrumb(5);
        assert_eq!(tree.current_path().len(), 3);

        tree.navigate_to_breadcrumb(0);
        assert_eq!(tree.current_path(), &[id("root-1")]);

        tree.navigate_to_root();
        assert!(tree.current_path().is_empty());
        assert_eq!(tree.current_folder_id(), None);
    }

    #[test]
    fn test_deep_link_restores_full_chain() {
        let mut tree = seeded();
        tree.navigate_into(&id("client-C001")).unwrap();
        let year = tree.create_folder("2025").unwrap();
        tree.navigate_into(&year.id).unwrap();
        let hearing = tree.create_folder("Hearings").unwrap();
        tree.navigate_to_root();

        tree.open_by_id_deep_link(&hearing.id).unwrap();
        assert_eq!(
            tree.current_path(),
            &[id("root-1"), id("client-C001"), year.id.clone(), hearing.id.clone()]
        );
        assert_eq!(
            names(&tree.breadcrumbs()),
            vec!["Clients", "Dream Infrastructure & Developers", "2025", "Hearings"]
        );
    }

    #[test]
    fn test_deep_link_to_missing_folder_keeps_path() {
        let mut tree = seeded();
        tree.navigate_into(&id("root-2")).unwrap();
        assert!(matches!(
            tree.open_by_id_deep_link(&id("client-C999")),
            Err(VaultError::NotFound(_))
        ));
        assert_eq!(tree.current_path(), &[id("root-2")]);
    }

    #[test]
    fn test_restore_path_keeps_valid_prefix() {
        let mut tree = seeded();
        let kept = tree.restore_path(&[id("root-1"), id("client-C001"), id("gone"), id("root-2")]);
        assert_eq!(kept, 2);
        assert_eq!(tree.current_path(), &[id("root-1"), id("client-C001")]);
    }

    #[test]
    fn test_restore_path_requires_parent_chain() {
        let mut tree = seeded();

        // client-C001 lives under root-1, not root-3
        assert_eq!(tree.restore_path(&[id("root-3"), id("client-C001")]), 1);
        assert_eq!(tree.current_path(), &[id("root-3")]);

        // A nested folder cannot start the breadcrumb
        assert_eq!(tree.restore_path(&[id("client-C001")]), 0);
        assert!(tree.current_path().is_empty());

        assert_eq!(tree.restore_path(&[id("root-1"), id("root-1")]), 1);
        assert_breadcrumb_is_chain(&tree);
    }

    #[test]
    fn test_activate_folder_and_file() {
        let mut tree = seeded();
        assert_eq!(
            tree.activate(&id("root-1")).unwrap(),
            Activation::Navigated(id("root-1"))
        );
        tree.navigate_into(&id("client-C001")).unwrap();
        let file = tree.add_file("Evidence_Photos.jpg", 4_718_592, None).unwrap();

        match tree.activate(&file.id).unwrap() {
            Activation::Selected(node) => assert_eq!(node, file),
            other => panic!("expected selection, got {:?}", other),
        }
        assert_eq!(tree.current_folder_id(), Some(&id("client-C001")));
        assert!(matches!(tree.activate(&id("x")), Err(VaultError::NotFound(_))));
    }

    #[test]
    fn test_delete_removes_full_subtree() {
        let mut tree = seeded();
        tree.navigate_into(&id("client-C001")).unwrap();
        tree.add_file("Vakalatnama.pdf", 1000, None).unwrap();
        let year = tree.create_folder("2025").unwrap();
        tree.navigate_into(&year.id).unwrap();
        let grandchild = tree.add_file("Order.pdf", 1000, None).unwrap();
        tree.navigate_to_root();

        let before = tree.len();
        let removed = tree.delete_node(&id("root-1"));

        // Clients, two client folders, one file, one sub-folder, one nested file
        assert_eq!(removed.len(), 6);
        assert_eq!(tree.len(), before - 6);
        assert!(tree.get(&grandchild.id).is_none());
        assert!(tree.get(&year.id).is_none());
        assert_well_formed(&tree);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let mut tree = seeded();
        let before = tree.snapshot();
        assert!(tree.delete_node(&id("does-not-exist")).is_empty());
        assert_eq!(tree.snapshot(), before);
        assert_eq!(tree.store().saves(), 0);
    }

    #[test]
    fn test_delete_file_leaves_siblings() {
        let mut tree = seeded();
        tree.navigate_into(&id("client-C002")).unwrap();
        let a = tree.add_file("a.pdf", 10, None).unwrap();
        let b = tree.add_file("b.pdf", 10, None).unwrap();

        let removed = tree.delete_node(&a.id);
        assert_eq!(removed, vec![a]);
        assert_eq!(tree.list_current(None), vec![tree.get(&b.id).unwrap()]);
    }

    #[test]
    fn test_delete_truncates_breadcrumb() {
        let mut tree = seeded();
        tree.navigate_into(&id("root-1")).unwrap();
        tree.navigate_into(&id("client-C001")).unwrap();

        tree.delete_node(&id("client-C001"));
        assert_eq!(tree.current_path(), &[id("root-1")]);

        tree.navigate_into(&id("client-C002")).unwrap();
        tree.delete_node(&id("root-1"));
        assert!(tree.current_path().is_empty());
    }

    #[test]
    fn test_rename() {
        let mut tree = seeded();
        tree.rename_node(&id("root-3"), "Statutes").unwrap();
        assert_eq!(tree.get(&id("root-3")).unwrap().name, "Statutes");

        assert!(matches!(
            tree.rename_node(&id("root-3"), ""),
            Err(VaultError::InvalidArgument(_))
        ));
        assert!(matches!(
            tree.rename_node(&id("missing"), "x"),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_move_node() {
        let mut tree = seeded();
        let scratch = tree.create_folder("Scratch").unwrap();
        tree.move_node(&scratch.id, Some(&id("root-4"))).unwrap();

        assert_eq!(tree.get(&scratch.id).unwrap().parent_id, Some(id("root-4")));
        assert!(tree.children_of(None).iter().all(|n| n.id != scratch.id));
        assert_eq!(names(&tree.children_of(Some(&id("root-4")))), vec!["Scratch"]);

        tree.move_node(&scratch.id, None).unwrap();
        assert_eq!(tree.get(&scratch.id).unwrap().parent_id, None);
        assert_well_formed(&tree);
    }

    #[test]
    fn test_move_rejects_cycles() {
        let mut tree = seeded();
        tree.navigate_into(&id("client-C001")).unwrap();
        let inner = tree.create_folder("Inner").unwrap();

        for target in [id("root-1"), id("client-C001"), inner.id.clone()] {
            match tree.move_node(&id("root-1"), Some(&target)) {
                Err(VaultError::Conflict(_)) => (),
                other => panic!("expected Conflict for {}, got {:?}", target, other),
            }
        }
        assert_eq!(tree.get(&id("root-1")).unwrap().parent_id, None);
        assert_well_formed(&tree);
    }

    #[test]
    fn test_move_active_folder_follows_breadcrumb() {
        let mut tree = seeded();
        tree.open_by_id_deep_link(&id("client-C001")).unwrap();

        tree.move_node(&id("client-C001"), Some(&id("root-2"))).unwrap();
        assert_eq!(tree.current_path(), &[id("root-2"), id("client-C001")]);

        tree.navigate_up();
        assert_eq!(tree.current_folder_id(), Some(&id("root-2")));
        assert_breadcrumb_is_chain(&tree);
    }

    #[test]
    fn test_move_ancestor_keeps_breadcrumb_tail() {
        let mut tree = seeded();
        tree.open_by_id_deep_link(&id("client-C001")).unwrap();
        let inner = tree.create_folder("Hearings").unwrap();
        tree.navigate_into(&inner.id).unwrap();

        tree.move_node(&id("client-C001"), Some(&id("root-2"))).unwrap();
        assert_eq!(
            tree.current_path(),
            &[id("root-2"), id("client-C001"), inner.id.clone()]
        );

        tree.move_node(&id("root-2"), Some(&id("root-3"))).unwrap();
        assert_eq!(
            tree.current_path(),
            &[id("root-3"), id("root-2"), id("client-C001"), inner.id.clone()]
        );
        assert_breadcrumb_is_chain(&tree);

        // Moving something off the breadcrumb leaves it alone
        tree.move_node(&id("client-C002"), Some(&id("root-4"))).unwrap();
        assert_eq!(tree.current_path().len(), 4);
        assert_well_formed(&tree);
    }

    #[test]
    fn test_move_into_file_or_missing_fails() {
        let mut tree = seeded();
        let file = tree.add_file("loose.pdf", 10, None).unwrap();
        assert!(matches!(
            tree.move_node(&id("root-2"), Some(&file.id)),
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            tree.move_node(&id("ghost"), None),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_unique_sibling_names() {
        let mut tree = seeded().with_name_policy(NamePolicy::UniquePerFolder);
        assert!(matches!(
            tree.create_folder("Clients"),
            Err(VaultError::Conflict(_))
        ));

        tree.navigate_into(&id("root-2")).unwrap();
        tree.create_folder("Clients").unwrap();
        tree.add_file("a.pdf", 1, None).unwrap();
        assert!(matches!(
            tree.add_file("a.pdf", 1, None),
            Err(VaultError::Conflict(_))
        ));

        // Renaming a node to its own name is not a clash
        tree.rename_node(&id("root-2"), "Judgments Library").unwrap();
        assert!(matches!(
            tree.rename_node(&id("root-2"), "Bare Acts"),
            Err(VaultError::Conflict(_))
        ));
    }

    #[test]
    fn test_duplicates_allowed_by_default() {
        let mut tree = empty();
        tree.create_folder("Drafts").unwrap();
        tree.create_folder("Drafts").unwrap();
        assert_eq!(tree.list_current(None).len(), 2);
    }

    #[test]
    fn test_register_client_folder() {
        let mut tree = seeded();
        let client = ClientRef::new("C003", "Amarsingh Rathod");
        let folder = tree.register_client_folder(&client).unwrap();

        assert_eq!(folder.id, id("client-C003"));
        assert_eq!(folder.parent_id, Some(id("root-1")));
        assert_eq!(folder.created_label, "Just now");

        assert!(matches!(
            tree.register_client_folder(&client),
            Err(VaultError::Conflict(_))
        ));
    }

    #[test]
    fn test_register_client_needs_clients_root() {
        let mut tree = empty();
        assert!(matches!(
            tree.register_client_folder(&ClientRef::new("C1", "Someone")),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_compute_usage() {
        let mut tree = seeded();
        assert_eq!(tree.compute_usage(2 * GIB).used_bytes, 0);
        assert_eq!(tree.compute_usage(2 * GIB).used_label, "0 B");

        tree.navigate_into(&id("client-C001")).unwrap();
        tree.add_file("Vakalatnama.pdf", 1_258_291, None).unwrap();
        tree.add_file("Case_Brief.docx", 24 * 1024, None).unwrap();

        let usage = tree.compute_usage(2 * GIB);
        let expected = 1.2 * 1024.0 * 1024.0 + 24.0 * 1024.0;
        assert!((usage.used_bytes as f64 - expected).abs() <= 1.0);
        assert_eq!(usage.limit_label, "2 GB");
        assert!(usage.percent_of_limit > 0.0 && usage.percent_of_limit < 1.0);
    }

    #[test]
    fn test_usage_caps_at_hundred() {
        let mut tree = empty();
        tree.add_file("huge.bin", 5 * GIB, None).unwrap();
        assert_eq!(tree.compute_usage(2 * GIB).percent_of_limit, 100.0);
        assert_eq!(tree.compute_usage(0).percent_of_limit, 100.0);
        assert_eq!(empty().compute_usage(0).percent_of_limit, 0.0);
    }

    #[test]
    fn test_mutations_persist_snapshot() {
        let mut tree = seeded();
        let folder = tree.create_folder("Litigation").unwrap();
        assert_eq!(tree.store().saves(), 1);
        assert_eq!(tree.store().snapshot().unwrap(), tree.snapshot().as_slice());

        tree.delete_node(&folder.id);
        assert_eq!(tree.store().saves(), 2);
        assert_eq!(tree.store().snapshot().unwrap().len(), tree.len());
    }

    #[test]
    fn test_store_failure_keeps_memory_state() {
        let mut tree = VaultTree::new(FailingStore);
        let folder = tree.create_folder("Litigation").unwrap();
        assert_eq!(tree.get(&folder.id), Some(&folder));
        assert!(matches!(tree.flush(), Err(VaultError::Store(_))));
    }

    #[test]
    fn test_open_round_trip_preserves_order() {
        let mut tree = seeded();
        tree.navigate_into(&id("client-C001")).unwrap();
        tree.add_file("Vakalatnama.pdf", 1_258_291, Some("blob:abc".to_string()))
            .unwrap();
        tree.create_folder("2025").unwrap();
        tree.flush().unwrap();

        let store = tree.store().clone();
        let reopened = VaultTree::open(store).unwrap();
        assert_eq!(reopened.snapshot(), tree.snapshot());
        assert!(reopened.current_path().is_empty());
    }

    #[test]
    fn test_open_or_seed_only_seeds_once() {
        let seed = default_topology(&[]);
        let tree = VaultTree::open_or_seed(MemoryStore::new(), seed.clone()).unwrap();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.store().saves(), 1);

        let persisted = vec![Node::folder(id("only"), None, "Only", "Today")];
        let tree = VaultTree::open_or_seed(MemoryStore::with_nodes(persisted), seed).unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_from_nodes_rejects_corrupt_collections() {
        let folder = |i: &str, p: Option<&str>| Node::folder(id(i), p.map(id), i, "Today");
        let file = Node::file(id("f"), None, "f.pdf", MediaType::Pdf, "1 KB", None, "Today");

        let cases = vec![
            vec![folder("a", None), folder("a", None)],
            vec![folder("a", Some("missing"))],
            vec![file.clone(), folder("child", Some("f"))],
            vec![folder("a", Some("b")), folder("b", Some("a"))],
            vec![folder("self", Some("self"))],
        ];
        for nodes in cases {
            match VaultTree::from_nodes(nodes, MemoryStore::new()) {
                Err(VaultError::Corrupt(_)) => (),
                Err(e) => panic!("expected Corrupt, got {:?}", e),
                Ok(_) => panic!("expected Corrupt, got a tree"),
            }
        }
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let mut tree = seeded();
        tree.navigate_into(&id("client-C001")).unwrap();
        let year = tree.create_folder("2025").unwrap();
        tree.navigate_into(&year.id).unwrap();
        let file = tree.add_file("Order.pdf", 10, None).unwrap();

        assert_eq!(
            names(&tree.ancestors(&file.id).unwrap()),
            vec!["Clients", "Dream Infrastructure & Developers", "2025"]
        );
        assert!(tree.ancestors(&id("root-1")).unwrap().is_empty());
        assert!(tree.ancestors(&id("zzz")).is_err());

        assert_eq!(
            names(&tree.descendants(&id("root-1"))),
            vec![
                "Dream Infrastructure & Developers",
                "2025",
                "Order.pdf",
                "Rahul Naresh Puglia"
            ]
        );
        assert!(tree.descendants(&file.id).is_empty());
    }
}
