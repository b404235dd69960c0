//! Object storage collaborator
//!
//! Backends classify their failures into [`StorageErrorKind`] so callers
//! never have to look at message text.

pub mod local;
pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use local::LocalFsStorage;
pub use supabase::SupabaseStorage;

/// Listing page size
pub const LIST_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Object or container does not exist
    NotFound,
    /// Non-overwriting create hit an existing object
    AlreadyExists,
    /// Rejected by the backend's access rules
    PermissionDenied,
    /// Anything else: network, server, malformed response
    Transient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Transient, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StorageError {}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// File metadata; absent on folder entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default, rename = "lastModified")]
    pub last_modified: Option<String>,
}

/// One listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<ObjectMetadata>,
}

impl ObjectEntry {
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.metadata.is_none()
    }

    /// Whether the entry looks like an image (mimetype, else extension)
    pub fn is_image(&self) -> bool {
        match &self.metadata {
            None => false,
            Some(meta) => match &meta.mimetype {
                Some(m) => m.starts_with("image/"),
                None => guess_mime(&self.name).starts_with("image/"),
            },
        }
    }
}

/// Folder names of a listing
pub fn folders(entries: &[ObjectEntry]) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.is_folder())
        .map(|e| e.name.clone())
        .collect()
}

/// File entries of a listing
pub fn files(entries: &[ObjectEntry]) -> Vec<ObjectEntry> {
    entries.iter().filter(|e| !e.is_folder()).cloned().collect()
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// false: fail with AlreadyExists instead of replacing
    pub upsert: bool,
    pub content_type: String,
}

/// Mime type from a file extension
pub fn guess_mime(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default().to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Bucket-scoped object store
#[async_trait]
pub trait Storage: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    fn bucket(&self) -> &str;

    /// Direct children of `prefix` ("" = bucket root), name ascending
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectEntry>>;

    async fn upload(&self, path: &str, bytes: Vec<u8>, options: UploadOptions) -> StorageResult<()>;

    async fn download(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Overwrite an existing object in place
    async fn update(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Public URL, if the backend can form one
    fn public_url(&self, path: &str) -> Option<String>;

    async fn create_signed_url(&self, path: &str, ttl_seconds: u64) -> StorageResult<String>;
}
