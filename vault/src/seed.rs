//! Default vault layout for a fresh install.

use crate::media::MediaType;
use crate::models::{ClientRef, Node, NodeId};

/// Root folder that holds one sub-folder per client
pub const CLIENTS_FOLDER_ID: &str = "root-1";

/// (id, name, created label)
const ROOT_FOLDERS: [(&str, &str, &str); 4] = [
    (CLIENTS_FOLDER_ID, "Clients", "Today"),
    ("root-2", "Judgments Library", "Yesterday"),
    ("root-3", "Bare Acts", "Last Week"),
    ("root-4", "Draft Templates", "Last Week"),
];

/// (id, name, media type, size label, created label)
const DEMO_FILES: [(&str, &str, MediaType, &str, &str); 3] = [
    ("f1", "Vakalatnama.pdf", MediaType::Pdf, "1.2 MB", "Today"),
    ("f2", "Case_Brief.docx", MediaType::Doc, "24 KB", "Yesterday"),
    ("f3", "Evidence_Photos.jpg", MediaType::Image, "4.5 MB", "2 days ago"),
];

/// The four fixed top-level folders plus a folder per known client.
///
/// Clients whose folder id is already taken are skipped, so passing the
/// same client twice yields a single folder.
pub fn default_topology(clients: &[ClientRef]) -> Vec<Node> {
    let mut nodes: Vec<Node> = ROOT_FOLDERS
        .iter()
        .map(|(id, name, label)| Node::folder(NodeId::from(*id), None, *name, *label))
        .collect();

    for client in clients {
        let folder_id = client.vault_folder_id();
        if nodes.iter().any(|n| n.id == folder_id) {
            tracing::debug!("Skipping duplicate client folder {}", folder_id);
            continue;
        }
        nodes.push(Node::folder(
            folder_id,
            Some(NodeId::from(CLIENTS_FOLDER_ID)),
            client.name.clone(),
            "Today",
        ));
    }

    nodes
}

/// [`default_topology`] plus a few sample documents in the first client's
/// folder. Without clients this is just the default layout.
pub fn demo_topology(clients: &[ClientRef]) -> Vec<Node> {
    let mut nodes = default_topology(clients);
    let clients_root = NodeId::from(CLIENTS_FOLDER_ID);
    let Some(first_client) = nodes
        .iter()
        .find(|n| n.parent_id.as_ref() == Some(&clients_root))
        .map(|n| n.id.clone())
    else {
        return nodes;
    };

    for (id, name, media_type, size, label) in DEMO_FILES {
        nodes.push(Node::file(
            NodeId::from(id),
            Some(first_client.clone()),
            name,
            media_type,
            size,
            None,
            label,
        ));
    }
    nodes
}
