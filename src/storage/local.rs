//! Filesystem backend
//!
//! Layout: `<root>/<bucket>/<object path>`. The bucket directory has to
//! exist; object directories below it are created on upload.

use super::{
    guess_mime, ObjectEntry, ObjectMetadata, Storage, StorageError, StorageErrorKind,
    StorageResult, UploadOptions,
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use walkdir::WalkDir;

use super::LIST_LIMIT;

pub struct LocalFsStorage {
    root: PathBuf,
    bucket: String,
    signing_secret: String,
}

impl LocalFsStorage {
    pub fn new(root: PathBuf, bucket: impl Into<String>, signing_secret: impl Into<String>) -> Self {
        Self {
            root,
            bucket: bucket.into(),
            signing_secret: signing_secret.into(),
        }
    }

    fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    /// Object path -> file path; rejects `..` and absolute components
    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::new(
                StorageErrorKind::PermissionDenied,
                format!("path traversal blocked: {}", path),
            ));
        }
        Ok(self.bucket_dir().join(relative))
    }

    async fn require_bucket(&self) -> StorageResult<()> {
        match tokio::fs::metadata(self.bucket_dir()).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(StorageError::not_found(format!("Bucket not found: {}", self.bucket))),
        }
    }

    /// Hex SHA-256 over secret, path and expiry
    pub fn sign(&self, path: &str, expires: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.signing_secret.as_bytes());
        hasher.update(b":");
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(expires.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    fn file_url(path: &Path) -> String {
        let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        format!("file://{}", absolute.display().to_string().replace('\\', "/"))
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// Direct children of `dir`, name ascending
fn list_dir(dir: &Path) -> StorageResult<Vec<ObjectEntry>> {
    if !dir.is_dir() {
        // same as a remote store: unknown prefix lists nothing
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type().is_dir() {
            entries.push(ObjectEntry::folder(name));
            continue;
        }
        let meta = entry.metadata().map_err(|e| StorageError::transient(e.to_string()))?;
        entries.push(ObjectEntry {
            metadata: Some(ObjectMetadata {
                size: meta.len(),
                mimetype: Some(guess_mime(&name).to_string()),
                last_modified: modified_rfc3339(&meta),
            }),
            name,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries.truncate(LIST_LIMIT);
    Ok(entries)
}

fn map_io(e: std::io::Error, what: &str) -> StorageError {
    let kind = match e.kind() {
        ErrorKind::NotFound => StorageErrorKind::NotFound,
        ErrorKind::AlreadyExists => StorageErrorKind::AlreadyExists,
        ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
        _ => StorageErrorKind::Transient,
    };
    StorageError::new(kind, format!("{} failed: {}", what, e))
}

fn modified_rfc3339(meta: &std::fs::Metadata) -> Option<String> {
    let modified = meta.modified().ok()?;
    let at: chrono::DateTime<chrono::Utc> = modified.into();
    Some(robodoc_common::format_timestamp(at))
}

#[async_trait]
impl Storage for LocalFsStorage {
    fn backend_tag(&self) -> &'static str {
        "local"
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(name = "local_list", skip(self))]
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectEntry>> {
        self.require_bucket().await?;
        let dir = self.resolve(prefix)?;
        // walkdir is synchronous
        tokio::task::spawn_blocking(move || list_dir(&dir))
            .await
            .map_err(|e| StorageError::transient(format!("list task failed: {}", e)))?
    }

    #[instrument(name = "local_upload", skip(self, bytes, options), fields(len = bytes.len()))]
    async fn upload(&self, path: &str, bytes: Vec<u8>, options: UploadOptions) -> StorageResult<()> {
        self.require_bucket().await?;
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io(e, "create folder"))?;
        }
        let mut open = OpenOptions::new();
        open.write(true);
        if options.upsert {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }
        let mut file = open.open(&target).await.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => StorageError::new(
                StorageErrorKind::AlreadyExists,
                format!("The resource already exists: {}", path),
            ),
            _ => map_io(e, "upload"),
        })?;
        file.write_all(&bytes).await.map_err(|e| map_io(e, "upload"))?;
        file.flush().await.map_err(|e| map_io(e, "upload"))?;
        Ok(())
    }

    #[instrument(name = "local_download", skip(self))]
    async fn download(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.require_bucket().await?;
        let target = self.resolve(path)?;
        fs::read(&target).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::not_found(format!("Object not found: {}", path)),
            _ => map_io(e, "download"),
        })
    }

    #[instrument(name = "local_update", skip(self, bytes, _content_type), fields(len = bytes.len()))]
    async fn update(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        self.require_bucket().await?;
        let target = self.resolve(path)?;
        if !is_file(&target).await {
            return Err(StorageError::not_found(format!("Object not found: {}", path)));
        }
        fs::write(&target, bytes).await.map_err(|e| map_io(e, "update"))
    }

    fn public_url(&self, path: &str) -> Option<String> {
        self.resolve(path).ok().map(|p| Self::file_url(&p))
    }

    async fn create_signed_url(&self, path: &str, ttl_seconds: u64) -> StorageResult<String> {
        let target = self.resolve(path)?;
        if !is_file(&target).await {
            return Err(StorageError::not_found(format!("Object not found: {}", path)));
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let expires = now + ttl_seconds;
        Ok(format!(
            "{}?expires={}&token={}",
            Self::file_url(&target),
            expires,
            self.sign(path, expires)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(root: &Path) -> LocalFsStorage {
        std::fs::create_dir_all(root.join("robodoc")).unwrap();
        LocalFsStorage::new(root.to_path_buf(), "robodoc", "secret")
    }

    fn jpeg() -> UploadOptions {
        UploadOptions {
            upsert: false,
            content_type: "image/jpeg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let dir = tempdir().unwrap();
        let s = store(dir.path());
        s.upload("SCARA/2525/Incoming/a.jpg", b"abc".to_vec(), jpeg()).await.unwrap();
        assert_eq!(s.download("SCARA/2525/Incoming/a.jpg").await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_upload_does_not_overwrite() {
        let dir = tempdir().unwrap();
        let s = store(dir.path());
        s.upload("a.jpg", b"one".to_vec(), jpeg()).await.unwrap();
        let err = s.upload("a.jpg", b"two".to_vec(), jpeg()).await.unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::AlreadyExists);
        assert_eq!(s.download("a.jpg").await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn test_missing_bucket_is_not_found() {
        let dir = tempdir().unwrap();
        let s = LocalFsStorage::new(dir.path().to_path_buf(), "nope", "secret");
        let err = s.upload("a.jpg", b"x".to_vec(), jpeg()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_requires_existing_object() {
        let dir = tempdir().unwrap();
        let s = store(dir.path());
        let err = s.update("m.json", b"{}".to_vec(), "application/json").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!dir.path().join("robodoc/m.json").exists());

        s.upload("m.json", b"{}".to_vec(), jpeg()).await.unwrap();
        s.update("m.json", b"[1]".to_vec(), "application/json").await.unwrap();
        assert_eq!(s.download("m.json").await.unwrap(), b"[1]");
    }

    #[tokio::test]
    async fn test_list_folders_and_files_sorted() {
        let dir = tempdir().unwrap();
        let s = store(dir.path());
        s.upload("SCARA/2525/Incoming/b.jpg", b"bb".to_vec(), jpeg()).await.unwrap();
        s.upload("SCARA/2525/Incoming/a.jpg", b"a".to_vec(), jpeg()).await.unwrap();
        s.upload("IVR/7001/Incoming/c.jpg", b"c".to_vec(), jpeg()).await.unwrap();

        let root = s.list("").await.unwrap();
        assert_eq!(root, vec![ObjectEntry::folder("IVR"), ObjectEntry::folder("SCARA")]);

        let files = s.list("SCARA/2525/Incoming").await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "a.jpg");
        assert_eq!(files[1].metadata.as_ref().unwrap().size, 2);
        assert!(files[1].is_image());

        assert!(s.list("SCARA/9999").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_traversal_blocked() {
        let dir = tempdir().unwrap();
        let s = store(dir.path());
        let err = s.download("../outside.txt").await.unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_signed_url_carries_token() {
        let dir = tempdir().unwrap();
        let s = store(dir.path());
        s.upload("a.jpg", b"x".to_vec(), jpeg()).await.unwrap();
        let url = s.create_signed_url("a.jpg", 60).await.unwrap();
        assert!(url.starts_with("file://"));
        let expires: u64 = url
            .split("expires=")
            .nth(1)
            .and_then(|rest| rest.split('&').next())
            .and_then(|v| v.parse().ok())
            .unwrap();
        assert!(url.ends_with(&format!("token={}", s.sign("a.jpg", expires))));
        assert!(s.create_signed_url("missing.jpg", 60).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_uploads_are_fully_written() {
        let dir = tempdir().unwrap();
        let s = store(dir.path());
        let paths: Vec<String> = (0..8).map(|i| format!("SCARA/2525/Incoming/{}.jpg", i)).collect();

        let results = futures::future::join_all(
            paths
                .iter()
                .map(|p| s.upload(p, vec![7u8; 64], jpeg())),
        )
        .await;
        assert!(results.iter().all(|r| r.is_ok()));

        let files = s.list("SCARA/2525/Incoming").await.unwrap();
        assert_eq!(files.len(), 8);
        assert!(files.iter().all(|f| f.metadata.as_ref().unwrap().size == 64));
    }
}
