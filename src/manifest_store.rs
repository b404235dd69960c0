//! Manifest persistence
//!
//! Finalize is edit-only: it never creates the manifest object. Creation is
//! a separate, one-time step (`robodoc manifest init`) because the storage
//! rules may grant insert and update to different roles.

use chrono::{DateTime, Utc};
use robodoc_common::manifest::MANIFEST_CONTENT_TYPE;
use robodoc_common::naming::{base_path, manifest_path};
use robodoc_common::{build_manifest, preserve_identity, seed_manifest, Manifest, RobotType, Session};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{RoboDocError, Result};
use crate::storage::{Storage, StorageErrorKind, UploadOptions};

/// Outcome of a successful finalize
#[derive(Debug, Clone)]
pub struct FinalizeReport {
    pub manifest_path: String,
    pub workflow_id: String,
    pub started_at: String,
    pub total_photos: usize,
    pub complete: bool,
}

/// Read-modify-write of `{base}/manifest.json` from the session.
///
/// Does not touch the session; the caller resets it on success.
#[instrument(name = "finalize_manifest", skip_all, fields(path = %session.manifest_path()))]
pub async fn finalize_manifest(
    storage: &dyn Storage,
    session: &Session,
    completed_at: DateTime<Utc>,
) -> Result<FinalizeReport> {
    let fresh = build_manifest(session, storage.bucket(), Uuid::new_v4().to_string(), completed_at);
    let path = session.manifest_path();

    let existing = match storage.download(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.is_not_found() => {
            warn!("manifest missing, refusing to create it");
            return Err(RoboDocError::ManifestMissing(path));
        }
        Err(e) => return Err(RoboDocError::ManifestRead(e)),
    };

    let manifest = preserve_identity(fresh, &existing);
    let payload = manifest.to_json_pretty()?;

    storage
        .update(&path, payload.into_bytes(), MANIFEST_CONTENT_TYPE)
        .await
        .map_err(RoboDocError::ManifestUpdate)?;

    info!(workflow_id = %manifest.workflow.id, "manifest updated");
    Ok(FinalizeReport {
        manifest_path: path,
        workflow_id: manifest.workflow.id,
        started_at: manifest.workflow.started_at,
        total_photos: manifest.summary.total_photos,
        complete: manifest.summary.all_required_steps_completed,
    })
}

/// Create the manifest object once so later finalizes can update it
#[instrument(name = "init_manifest", skip(storage))]
pub async fn init_manifest(
    storage: &dyn Storage,
    robot_type: RobotType,
    serial: &str,
    context: &str,
) -> Result<String> {
    let path = manifest_path(&base_path(robot_type, serial, context));
    let seed = seed_manifest(robot_type, serial, context, storage.bucket(), Utc::now());
    let options = UploadOptions {
        upsert: false,
        content_type: MANIFEST_CONTENT_TYPE.to_string(),
    };

    match storage.upload(&path, seed.to_json_pretty()?.into_bytes(), options).await {
        Ok(()) => Ok(path),
        Err(e) => Err(match e.kind {
            StorageErrorKind::AlreadyExists => RoboDocError::ManifestExists(path),
            StorageErrorKind::NotFound => RoboDocError::BucketNotFound(storage.bucket().to_string()),
            _ => RoboDocError::Storage(e),
        }),
    }
}

/// Fetch and parse a stored manifest
pub async fn read_manifest(
    storage: &dyn Storage,
    robot_type: RobotType,
    serial: &str,
    context: &str,
) -> Result<Manifest> {
    let path = manifest_path(&base_path(robot_type, serial, context));
    let bytes = storage.download(&path).await.map_err(|e| {
        if e.is_not_found() {
            RoboDocError::ManifestMissing(path.clone())
        } else {
            RoboDocError::ManifestRead(e)
        }
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}
