use crate::error::{RoboDocError, Result};
use crate::storage::{LocalFsStorage, Storage, SupabaseStorage};
use robodoc_common::ChecklistCatalog;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_STORAGE_URL: &str = "ROBODOC_STORAGE_URL";
pub const ENV_STORAGE_KEY: &str = "ROBODOC_STORAGE_KEY";
pub const ENV_BUCKET: &str = "ROBODOC_BUCKET";
pub const ENV_BACKEND: &str = "ROBODOC_STORAGE_BACKEND";
pub const ENV_LOCAL_ROOT: &str = "ROBODOC_LOCAL_ROOT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Supabase,
    Local,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "supabase" => Ok(StorageBackend::Supabase),
            "local" | "fs" => Ok(StorageBackend::Local),
            _ => Err(format!("Unknown storage backend: {}. Use supabase or local", s)),
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Supabase => write!(f, "supabase"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: StorageBackend,
    pub storage_url: Option<String>,
    pub storage_key: Option<String>,
    pub bucket: String,
    /// Root folder of the local backend (buckets are its subfolders)
    pub local_root: Option<PathBuf>,
    /// Replaces the built-in checklist catalog
    pub checklists_path: Option<PathBuf>,
    pub signed_url_ttl_seconds: u64,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Supabase,
            storage_url: None,
            storage_key: None,
            bucket: "robodoc".into(),
            local_root: None,
            checklists_path: None,
            signed_url_ttl_seconds: 60 * 60,
            timeout_seconds: 60,
        }
    }
}

impl Config {
    /// Config file, then environment overrides
    pub fn load() -> Result<Self> {
        Self::load_file()?.with_env(|key| std::env::var(key).ok())
    }

    /// Config file only; what `save` should write back
    pub fn load_file() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RoboDocError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("robodoc").join("config.json"))
    }

    /// Apply environment overrides through a lookup function
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_STORAGE_URL) {
            self.storage_url = Some(url);
        }
        if let Some(key) = non_empty(ENV_STORAGE_KEY) {
            self.storage_key = Some(key);
        }
        if let Some(bucket) = non_empty(ENV_BUCKET) {
            self.bucket = bucket;
        }
        if let Some(backend) = non_empty(ENV_BACKEND) {
            self.backend = backend.parse().map_err(RoboDocError::Config)?;
        }
        if let Some(root) = non_empty(ENV_LOCAL_ROOT) {
            self.local_root = Some(PathBuf::from(root));
        }
        Ok(self)
    }

    /// Storage client, or `None` when the backend is not configured.
    ///
    /// Callers hand `None` to the controllers, which then refuse every
    /// storage action with [`RoboDocError::MissingStorageConfig`].
    pub fn open_storage(&self) -> Option<Box<dyn Storage>> {
        match self.backend {
            StorageBackend::Supabase => {
                let url = self.storage_url.as_deref().filter(|s| !s.is_empty())?;
                let key = self.storage_key.as_deref().filter(|s| !s.is_empty())?;
                Some(Box::new(SupabaseStorage::new(url, key, &self.bucket, self.timeout_seconds)))
            }
            StorageBackend::Local => {
                let root = self.local_root.clone()?;
                // the key doubles as signing secret; any value works locally
                let secret = self.storage_key.clone().unwrap_or_else(|| "robodoc-local".into());
                Some(Box::new(LocalFsStorage::new(root, &self.bucket, secret)))
            }
        }
    }

    /// Checklist catalog: configured file or the built-in one
    pub fn checklist_catalog(&self) -> Result<ChecklistCatalog> {
        match &self.checklists_path {
            Some(path) => Ok(ChecklistCatalog::from_file(path)?),
            None => Ok(ChecklistCatalog::builtin()),
        }
    }
}
