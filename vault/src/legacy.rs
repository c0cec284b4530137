//! Import of vault dumps written by the old browser front-end.
//!
//! That format used `type`/`fileType`/`size`/`date`/`fileUrl` keys and its
//! delete only removed direct children, so dumps may contain orphans whose
//! parent no longer exists. Orphans are dropped on import.

use crate::error::{Result, StoreError};
use crate::media::MediaType;
use crate::models::{Node, NodeId};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LegacyKind {
    Folder,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyItem {
    id: String,
    parent_id: Option<String>,
    name: String,
    #[serde(rename = "type")]
    kind: LegacyKind,
    file_type: Option<String>,
    size: Option<String>,
    #[serde(default)]
    date: String,
    file_url: Option<String>,
}

/// Result of converting a legacy dump
#[derive(Debug, Clone)]
pub struct LegacyImport {
    pub nodes: Vec<Node>,
    /// Ids that were dropped (duplicates and nodes not reachable from the root)
    pub dropped: Vec<NodeId>,
}

/// Parse a legacy JSON dump into a well-formed node collection.
pub fn import_legacy(json: &str) -> Result<LegacyImport> {
    let items: Vec<LegacyItem> = serde_json::from_str(json).map_err(StoreError::from)?;

    let mut dropped = Vec::new();
    let mut seen = HashSet::new();
    let mut nodes = Vec::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id.clone()) {
            dropped.push(NodeId::from(item.id));
            continue;
        }
        nodes.push(convert(item));
    }

    let folders: HashMap<&NodeId, Option<&NodeId>> = nodes
        .iter()
        .filter(|n| n.is_folder())
        .map(|n| (&n.id, n.parent_id.as_ref()))
        .collect();

    let reachable: Vec<bool> = nodes
        .iter()
        .map(|n| reaches_root(n.parent_id.as_ref(), &folders))
        .collect();

    let mut kept = Vec::with_capacity(nodes.len());
    for (node, ok) in nodes.into_iter().zip(reachable) {
        if ok {
            kept.push(node);
        } else {
            tracing::warn!("Dropping orphaned vault item {} ({})", node.id, node.name);
            dropped.push(node.id);
        }
    }

    tracing::info!(
        "Imported {} legacy vault items ({} dropped)",
        kept.len(),
        dropped.len()
    );
    Ok(LegacyImport {
        nodes: kept,
        dropped,
    })
}

fn reaches_root<'a>(
    mut cursor: Option<&'a NodeId>,
    folders: &HashMap<&'a NodeId, Option<&'a NodeId>>,
) -> bool {
    let mut steps = 0;
    while let Some(parent_id) = cursor {
        steps += 1;
        if steps > folders.len() {
            return false;
        }
        match folders.get(parent_id) {
            Some(grandparent) => cursor = *grandparent,
            None => return false,
        }
    }
    true
}

fn convert(item: LegacyItem) -> Node {
    let id = NodeId::from(item.id);
    let parent_id = item.parent_id.map(NodeId::from);

    match item.kind {
        LegacyKind::Folder => Node::folder(id, parent_id, item.name, item.date),
        LegacyKind::File => {
            let media_type = match item.file_type.as_deref() {
                Some("pdf") => MediaType::Pdf,
                Some("doc") => MediaType::Doc,
                Some("xls") => MediaType::Spreadsheet,
                Some("image") => MediaType::Image,
                Some(_) => MediaType::Unknown,
                None => MediaType::from_file_name(&item.name),
            };

            // blob: URLs only lived as long as the browser session
            let content_ref = item
                .file_url
                .filter(|url| !url.is_empty() && !url.starts_with("blob:"));

            Node::file(
                id,
                parent_id,
                item.name,
                media_type,
                item.size.unwrap_or_else(|| "0 B".to_string()),
                content_ref,
                item.date,
            )
        }
    }
}
