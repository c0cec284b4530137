use clap::{Parser, Subcommand};
use nyaya_vault::legacy::import_legacy;
use nyaya_vault::seed::{default_topology, demo_topology, CLIENTS_FOLDER_ID};
use nyaya_vault::{Activation, ClientRef, Node, NodeId};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod guard;
mod session;
mod tui;

use config::{Backend, Config};
use session::Session;

#[derive(Parser)]
#[command(name = "nyaya")]
#[command(about = "Nyaya digital vault", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vault (or reset it to the default folders with --force)
    Init {
        /// Storage backend to record in the config
        #[arg(long, value_enum)]
        backend: Option<Backend>,
        /// Replace the existing vault with the default folders
        #[arg(long)]
        force: bool,
        /// Reset to the default folders plus sample documents in the first client's folder
        #[arg(long)]
        demo: bool,
    },
    /// Show configuration and vault status
    Status,
    /// List the current folder, or search the whole vault
    Ls {
        /// Case-insensitive name filter across the whole vault
        #[arg(short, long)]
        query: Option<String>,
        /// Print the entire hierarchy
        #[arg(long)]
        tree: bool,
    },
    /// Change folder: an id or name, `..`, `/`, or a breadcrumb position
    Cd {
        target: Option<String>,
        /// Jump to this breadcrumb position (0 = first folder below root)
        #[arg(long, conflicts_with = "target")]
        crumb: Option<usize>,
    },
    /// Print the current breadcrumb
    Pwd,
    /// Create a folder in the current folder
    Mkdir { name: String },
    /// Record a local file in the current folder
    Add {
        path: PathBuf,
        /// Name to store instead of the file name
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete an entry and everything below it
    Rm {
        id: String,
        /// Skip the confirmation prompt (the master password is still required)
        #[arg(short, long)]
        yes: bool,
    },
    /// Move an entry into a folder (`/` for the top level)
    Mv { id: String, target: String },
    /// Rename an entry
    Rename { id: String, name: String },
    /// Open an entry by id: folders are entered with a full breadcrumb
    Open { id: String },
    /// Show details of an entry
    Show { id: String },
    /// Show storage usage against the configured limit
    Usage,
    /// Client folders
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },
    /// Replace the vault with a JSON dump from the old front-end
    Import {
        path: PathBuf,
        #[arg(short, long)]
        yes: bool,
    },
    /// Write the vault collection as JSON
    Export { path: PathBuf },
    /// Set, change or clear the master password
    Passwd {
        #[arg(long)]
        clear: bool,
    },
    /// Interactive vault browser
    Browse {
        /// Folder id to open on start
        #[arg(long)]
        open: Option<String>,
    },
}

#[derive(Subcommand)]
enum ClientCommands {
    /// List client folders
    Ls,
    /// Give a client a folder under "Clients"
    Add { id: String, name: String },
    /// Open a client's folder in the browser
    Open {
        id: String,
        /// Only record the request; the next command serves it
        #[arg(long)]
        no_browse: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;

    // The browser owns the terminal; no log output there
    match &cli.command {
        None => return tui::run(&config),
        Some(Commands::Browse { open }) => {
            if let Some(id) = open {
                let session = Session::open(&config)?;
                let folder_id = session.resolve(id)?;
                session.request_deep_link(&folder_id)?;
                session.close()?;
            }
            return tui::run(&config);
        }
        Some(Commands::Client {
            command: ClientCommands::Open { id, no_browse: false },
        }) => {
            client_open(&config, id)?;
            return tui::run(&config);
        }
        _ => {}
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nyaya=info,nyaya_vault=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Some(Commands::Init { backend, force, demo }) => init(&mut config, backend, force, demo)?,
        Some(Commands::Status) => status(&config)?,
        Some(Commands::Ls { query, tree }) => list(&config, query.as_deref(), tree)?,
        Some(Commands::Cd { target, crumb }) => change_dir(&config, target.as_deref(), crumb)?,
        Some(Commands::Pwd) => pwd(&config)?,
        Some(Commands::Mkdir { name }) => {
            let mut session = Session::open(&config)?;
            let folder = session.tree.create_folder(&name)?;
            println!("created {} ({})", folder.name, folder.id);
            session.close()?;
        }
        Some(Commands::Add { path, name }) => add(&config, &path, name.as_deref())?,
        Some(Commands::Rm { id, yes }) => remove(&config, &id, yes)?,
        Some(Commands::Mv { id, target }) => {
            let mut session = Session::open(&config)?;
            let id = session.resolve(&id)?;
            let target = match target.as_str() {
                "/" => None,
                other => Some(session.resolve(other)?),
            };
            session.tree.move_node(&id, target.as_ref())?;
            println!("moved {}", id);
            session.close()?;
        }
        Some(Commands::Rename { id, name }) => {
            let mut session = Session::open(&config)?;
            let id = session.resolve(&id)?;
            session.tree.rename_node(&id, &name)?;
            println!("renamed {}", id);
            session.close()?;
        }
        Some(Commands::Open { id }) => open(&config, &id)?,
        Some(Commands::Show { id }) => {
            let session = Session::open(&config)?;
            let id = session.resolve(&id)?;
            show(&session, &id)?;
        }
        Some(Commands::Usage) => usage(&config)?,
        Some(Commands::Client { command }) => match command {
            ClientCommands::Ls => client_list(&config)?,
            ClientCommands::Add { id, name } => client_add(&mut config, &id, &name)?,
            ClientCommands::Open { id, .. } => {
                client_open(&config, &id)?;
                println!("client folder will open on the next command");
            }
        },
        Some(Commands::Import { path, yes }) => import(&config, &path, yes)?,
        Some(Commands::Export { path }) => {
            let session = Session::open(&config)?;
            let json = serde_json::to_string_pretty(&session.tree.snapshot())?;
            std::fs::write(&path, json)?;
            println!("exported {} entries to {}", session.tree.len(), path.display());
        }
        Some(Commands::Passwd { clear }) => passwd(&mut config, clear)?,
        Some(Commands::Browse { .. }) | None => unreachable!(),
    }

    Ok(())
}

fn init(
    config: &mut Config,
    backend: Option<Backend>,
    force: bool,
    demo: bool,
) -> anyhow::Result<()> {
    if let Some(backend) = backend {
        config.backend = backend;
        config.save()?;
    }

    let mut session = Session::open(config)?;
    if force || demo {
        let layout = if demo { "demo layout" } else { "default folders" };
        let question = format!("Reset the vault ({} entries) to the {}?", session.tree.len(), layout);
        if !guard::confirm_destructive(config, &question, false)? {
            println!("aborted");
            return Ok(());
        }
        let seed = if demo {
            demo_topology(&config.clients)
        } else {
            default_topology(&config.clients)
        };
        session.replace(seed)?;
        session.tree.navigate_to_root();
        println!("vault reset");
    } else {
        println!("vault ready ({} entries)", session.tree.len());
    }
    session.close()
}

fn status(config: &Config) -> anyhow::Result<()> {
    let session = Session::open(config)?;
    let store = match config.backend {
        Backend::Sqlite => config.db_path()?,
        Backend::Json => config.json_path()?,
    };
    let usage = session.tree.compute_usage(config.storage_limit_bytes);
    let folders = session.tree.nodes().filter(|n| n.is_folder()).count();

    println!("config: {}", Config::config_path()?.display());
    println!("store: {:?} ({})", config.backend, store.display());
    println!("entries: {} ({} folders)", session.tree.len(), folders);
    println!("usage: {} of {}", usage.used_label, usage.limit_label);
    println!(
        "master password: {}",
        if config.has_master_password() { "set" } else { "not set" }
    );
    Ok(())
}

fn list(config: &Config, query: Option<&str>, tree: bool) -> anyhow::Result<()> {
    let session = Session::open(config)?;

    if tree {
        print_tree(&session, None, 0);
        return Ok(());
    }

    let entries = session.tree.list_current(query);
    if entries.is_empty() {
        match query {
            Some(q) if !q.is_empty() => println!("no matches for '{}'", q),
            _ => println!("empty folder"),
        }
        return Ok(());
    }

    for node in entries {
        println!("{}", entry_line(node));
    }
    Ok(())
}

fn print_tree(session: &Session, parent: Option<&NodeId>, depth: usize) {
    for node in session.tree.children_of(parent) {
        println!("{}{}", "  ".repeat(depth), entry_line(node));
        if node.is_folder() {
            print_tree(session, Some(&node.id), depth + 1);
        }
    }
}

fn entry_line(node: &Node) -> String {
    match node.media_type() {
        Some(media_type) => format!(
            "{:>10}  {:<6}  {}  [{}]",
            node.size_label().unwrap_or(""),
            media_type.name(),
            node.name,
            node.id
        ),
        None => format!("{:>10}  {:<6}  {}/  [{}]", "", "folder", node.name, node.id),
    }
}

fn breadcrumb_line(session: &Session) -> String {
    let names: Vec<&str> = session
        .tree
        .breadcrumbs()
        .into_iter()
        .map(|n| n.name.as_str())
        .collect();
    format!("/{}", names.join("/"))
}

fn change_dir(config: &Config, target: Option<&str>, crumb: Option<usize>) -> anyhow::Result<()> {
    let mut session = Session::open(config)?;

    match (target, crumb) {
        (_, Some(index)) => session.tree.navigate_to_breadcrumb(index),
        (None, None) | (Some("/"), None) => session.tree.navigate_to_root(),
        (Some(".."), None) => session.tree.navigate_up(),
        (Some(arg), None) => {
            let id = session.resolve(arg)?;
            let is_child = session
                .tree
                .get(&id)
                .map_or(false, |n| n.parent_id.as_ref() == session.tree.current_folder_id());
            if is_child {
                session.tree.navigate_into(&id)?;
            } else {
                session.tree.open_by_id_deep_link(&id)?;
            }
        }
    }

    println!("{}", breadcrumb_line(&session));
    session.close()
}

fn pwd(config: &Config) -> anyhow::Result<()> {
    let session = Session::open(config)?;
    println!("{}", breadcrumb_line(&session));
    for (index, node) in session.tree.breadcrumbs().into_iter().enumerate() {
        println!("  {}: {}  [{}]", index, node.name, node.id);
    }
    Ok(())
}

fn add(config: &Config, path: &std::path::Path, name: Option<&str>) -> anyhow::Result<()> {
    let path = config::expand_home(&path.to_string_lossy());
    let metadata = std::fs::metadata(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    if !metadata.is_file() {
        anyhow::bail!("{} is not a file", path.display());
    }

    let name = match name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("{} has no file name", path.display()))?,
    };
    let content_ref = session::file_url(&std::fs::canonicalize(&path)?);

    let mut session = Session::open(config)?;
    let file = session.tree.add_file(&name, metadata.len(), Some(content_ref))?;
    println!(
        "added {} ({}, {})",
        file.name,
        file.size_label().unwrap_or(""),
        file.id
    );

    let usage = session.tree.compute_usage(config.storage_limit_bytes);
    if usage.used_bytes > usage.limit_bytes {
        tracing::warn!(
            "Vault is over its storage limit ({} of {})",
            usage.used_label,
            usage.limit_label
        );
    }
    session.close()
}

fn remove(config: &Config, id: &str, yes: bool) -> anyhow::Result<()> {
    let mut session = Session::open(config)?;
    let id = session.resolve(id)?;
    let (name, is_folder) = match session.tree.get(&id) {
        Some(node) => (node.name.clone(), node.is_folder()),
        None => anyhow::bail!("No entry {}", id),
    };

    let question = if is_folder {
        let inside = session.tree.descendants(&id).len();
        format!("Delete folder '{}' and {} entries inside?", name, inside)
    } else {
        format!("Delete '{}'?", name)
    };
    if !guard::confirm_destructive(config, &question, yes)? {
        println!("aborted");
        return Ok(());
    }

    let removed = session.tree.delete_node(&id);
    println!("deleted {} entries", removed.len());
    session.close()
}

fn open(config: &Config, id: &str) -> anyhow::Result<()> {
    let mut session = Session::open(config)?;
    let id = session.resolve(id)?;

    let is_folder = session.tree.get(&id).map_or(false, Node::is_folder);
    if is_folder {
        session.tree.open_by_id_deep_link(&id)?;
        println!("{}", breadcrumb_line(&session));
        return session.close();
    }

    // Files go through activation so the CLI and the browser agree
    if let Activation::Selected(file) = session.tree.activate(&id)? {
        show(&session, &file.id)?;
    }
    Ok(())
}

fn show(session: &Session, id: &NodeId) -> anyhow::Result<()> {
    let node = session
        .tree
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("No entry {}", id))?;
    let location: Vec<String> = session
        .tree
        .ancestors(id)?
        .into_iter()
        .map(|n| n.name.clone())
        .collect();

    println!("name: {}", node.name);
    println!("id: {}", node.id);
    println!("location: /{}", location.join("/"));
    match node.media_type() {
        Some(media_type) => {
            println!("type: {}", media_type.name());
            println!("size: {}", node.size_label().unwrap_or(""));
            if let Some(content_ref) = node.content_ref() {
                println!("content: {}", content_ref);
            }
        }
        None => {
            println!("type: folder");
            println!("entries: {}", session.tree.descendants(id).len());
        }
    }
    let created = node
        .created_at
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| node.created_label.clone());
    println!("created: {}", created);
    Ok(())
}

fn usage(config: &Config) -> anyhow::Result<()> {
    let session = Session::open(config)?;
    let usage = session.tree.compute_usage(config.storage_limit_bytes);

    println!(
        "{} {:.1}%",
        tui::usage_bar(usage.percent_of_limit, 30),
        usage.percent_of_limit
    );
    println!("{} of {} used", usage.used_label, usage.limit_label);
    Ok(())
}

fn client_list(config: &Config) -> anyhow::Result<()> {
    let session = Session::open(config)?;
    let clients_root = NodeId::from(CLIENTS_FOLDER_ID);
    let folders = session.tree.children_of(Some(&clients_root));

    if folders.is_empty() {
        println!("no client folders");
        return Ok(());
    }
    for folder in folders.into_iter().filter(|n| n.is_folder()) {
        let files = session.tree.descendants(&folder.id).len();
        println!("  {}  {} entries  [{}]", folder.name, files, folder.id);
    }
    Ok(())
}

fn client_add(config: &mut Config, id: &str, name: &str) -> anyhow::Result<()> {
    let client = ClientRef::new(id, name);
    let mut session = Session::open(config)?;
    let folder = session.tree.register_client_folder(&client)?;
    session.close()?;

    if !config.clients.iter().any(|c| c.id == client.id) {
        config.clients.push(client);
        config.save()?;
    }
    println!("created client folder {} ({})", folder.name, folder.id);
    Ok(())
}

/// Record a deep link to a client's folder for the next session to serve.
fn client_open(config: &Config, id: &str) -> anyhow::Result<()> {
    let client = config
        .clients
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .unwrap_or_else(|| ClientRef::new(id, id));

    let session = Session::open(config)?;
    session.request_deep_link(&client.vault_folder_id())?;
    session.close()
}

fn import(config: &Config, path: &std::path::Path, yes: bool) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)?;
    let imported = import_legacy(&json)?;

    let mut session = Session::open(config)?;
    let question = format!(
        "Replace the vault ({} entries) with {} imported entries?",
        session.tree.len(),
        imported.nodes.len()
    );
    if !guard::confirm_destructive(config, &question, yes)? {
        println!("aborted");
        return Ok(());
    }

    let count = imported.nodes.len();
    session.replace(imported.nodes)?;
    session.tree.navigate_to_root();
    println!("imported {} entries ({} dropped)", count, imported.dropped.len());
    session.close()
}

fn passwd(config: &mut Config, clear: bool) -> anyhow::Result<()> {
    if let Some(hash) = &config.master_password_hash {
        let current = guard::prompt_password("Current master password: ")?;
        if !guard::verify_password(&current, hash)? {
            anyhow::bail!("Incorrect master password");
        }
    }

    if clear {
        config.master_password_hash = None;
        config.save()?;
        println!("master password cleared");
        return Ok(());
    }

    let password = guard::prompt_new_password()?;
    config.master_password_hash = Some(guard::hash_password(&password)?);
    config.save()?;
    println!("master password set");
    Ok(())
}
