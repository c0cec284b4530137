use directories::ProjectDirs;
use nyaya_vault::{ClientRef, NamePolicy, DEFAULT_STORAGE_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Overrides both the config and the data directory
const HOME_ENV: &str = "NYAYA_HOME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Key-value table in the local SQLite database
    #[default]
    Sqlite,
    /// Plain JSON file next to the database
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub data_dir: Option<String>,
    pub storage_limit_bytes: u64,
    pub unique_sibling_names: bool,
    /// argon2 PHC string; when set, destructive commands ask for the password
    pub master_password_hash: Option<String>,
    /// Clients that get a folder when the vault is first seeded
    pub clients: Vec<ClientRef>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: None,
            storage_limit_bytes: DEFAULT_STORAGE_LIMIT,
            unique_sibling_names: false,
            master_password_hash: None,
            clients: Vec::new(),
        }
    }
}

impl Config {
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let config_dir = match std::env::var_os(HOME_ENV) {
            Some(home) => PathBuf::from(home),
            None => ProjectDirs::from("com", "nyaya", "nyaya")
                .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
                .config_dir()
                .to_path_buf(),
        };
        std::fs::create_dir_all(&config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Where the database (and the JSON store, if selected) live
    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(expand_home(dir));
        }
        if let Some(home) = std::env::var_os(HOME_ENV) {
            return Ok(PathBuf::from(home));
        }

        let proj_dirs = ProjectDirs::from("com", "nyaya", "nyaya")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn db_path(&self) -> anyhow::Result<PathBuf> {
        Ok(self.data_dir()?.join("vault.db"))
    }

    pub fn json_path(&self) -> anyhow::Result<PathBuf> {
        Ok(self.data_dir()?.join("vault.json"))
    }

    pub fn name_policy(&self) -> NamePolicy {
        if self.unique_sibling_names {
            NamePolicy::UniquePerFolder
        } else {
            NamePolicy::AllowDuplicates
        }
    }

    pub fn has_master_password(&self) -> bool {
        self.master_password_hash.is_some()
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
