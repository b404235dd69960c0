use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoboDocError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing storage configuration. Set ROBODOC_STORAGE_URL and ROBODOC_STORAGE_KEY.")]
    MissingStorageConfig,

    #[error("Bucket \"{0}\" not found. Create it in storage or set ROBODOC_BUCKET to an existing bucket.")]
    BucketNotFound(String),

    #[error("Manifest update skipped: {0} does not exist yet. Create it once (with insert permission), then future runs can edit it.")]
    ManifestMissing(String),

    #[error("Manifest read failed: {0}")]
    ManifestRead(StorageError),

    #[error("Manifest update failed: {0}")]
    ManifestUpdate(StorageError),

    #[error("Manifest already exists: {0}")]
    ManifestExists(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Could not create a URL for this file: {0}")]
    NoFileUrl(String),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] robodoc_common::Error),
}

pub type Result<T> = std::result::Result<T, RoboDocError>;

impl From<dialoguer::Error> for RoboDocError {
    fn from(e: dialoguer::Error) -> Self {
        RoboDocError::Prompt(e.to_string())
    }
}
