//! Error cases
//!
//! Operator-facing messages and error mapping at the crate edges.

use robodoc::config::{Config, ENV_BACKEND, ENV_STORAGE_KEY, ENV_STORAGE_URL};
use robodoc::error::RoboDocError;
use robodoc::preview::PhotoFile;
use robodoc::storage::StorageError;
use robodoc_common::ChecklistCatalog;
use std::path::Path;
use tempfile::tempdir;

/// Picking a photo that does not exist
#[test]
fn test_photo_file_not_found() {
    let result = PhotoFile::from_path(Path::new("/nonexistent/path/12345.jpg"));
    assert!(matches!(result, Err(RoboDocError::FileNotFound(_))));
}

/// A directory is not a photo
#[test]
fn test_photo_file_is_directory() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = PhotoFile::from_path(dir.path());
    assert!(matches!(result, Err(RoboDocError::FileNotFound(_))));
}

/// Unknown bytes fall back to the declared type, then JPEG
#[test]
fn test_photo_file_mime_fallback() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello").unwrap();

    let mut file = PhotoFile::from_path(&path).unwrap();
    assert_eq!(file.mime_type(), "image/jpeg");
    file.declared_mime = Some("image/heic".into());
    assert_eq!(file.mime_type(), "image/heic");
}

/// Broken checklist catalog file
#[test]
fn test_checklist_catalog_invalid_json() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("checklists.json");
    std::fs::write(&path, "{ invalid json }").unwrap();

    assert!(ChecklistCatalog::from_file(&path).is_err());
}

/// Missing checklist catalog file
#[test]
fn test_checklist_catalog_missing_file() {
    let result = ChecklistCatalog::from_file(Path::new("/nonexistent/checklists.json"));
    assert!(result.is_err());
}

/// Unknown backend name in the environment
#[test]
fn test_config_invalid_backend() {
    let result = Config::default().with_env(|key| (key == ENV_BACKEND).then(|| "ftp".to_string()));
    match result {
        Err(RoboDocError::Config(msg)) => assert!(msg.contains("ftp")),
        _ => panic!("expected config error"),
    }
}

/// Supabase without URL and key has no storage
#[test]
fn test_config_without_credentials() {
    let config = Config::default().with_env(|_| None).unwrap();
    assert!(config.open_storage().is_none());

    let config = Config::default()
        .with_env(|key| match key {
            k if k == ENV_STORAGE_URL => Some("https://abc.supabase.co".into()),
            k if k == ENV_STORAGE_KEY => Some("   ".into()),
            _ => None,
        })
        .unwrap();
    assert!(config.open_storage().is_none());
}

/// Messages shown to the operator
#[test]
fn test_error_messages() {
    assert_eq!(
        RoboDocError::MissingStorageConfig.to_string(),
        "Missing storage configuration. Set ROBODOC_STORAGE_URL and ROBODOC_STORAGE_KEY."
    );
    assert_eq!(
        RoboDocError::BucketNotFound("robodoc".into()).to_string(),
        "Bucket \"robodoc\" not found. Create it in storage or set ROBODOC_BUCKET to an existing bucket."
    );
    assert_eq!(
        RoboDocError::ManifestRead(StorageError::transient("timeout")).to_string(),
        "Manifest read failed: timeout"
    );
    // backend messages pass through unchanged
    assert_eq!(
        RoboDocError::from(StorageError::transient("connection reset")).to_string(),
        "connection reset"
    );
}
