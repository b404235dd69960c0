//! Guided capture controller
//!
//! Owns the [`Session`] together with the storage client and the preview
//! registry, and runs the two storage-backed actions: photo upload and
//! manifest finalize.

use chrono::Utc;
use robodoc_common::{find_context, ChecklistCatalog, Photo, RobotType, Screen, Session, UploadedObject};
use tracing::{debug, info, instrument, warn};

use crate::error::{RoboDocError, Result};
use crate::manifest_store::{finalize_manifest, FinalizeReport};
use crate::preview::{PhotoFile, PreviewRegistry};
use crate::storage::{Storage, StorageErrorKind, UploadOptions};

pub struct CaptureController {
    session: Session,
    catalog: ChecklistCatalog,
    storage: Option<Box<dyn Storage>>,
    previews: PreviewRegistry,
}

fn require(storage: &Option<Box<dyn Storage>>) -> Result<&dyn Storage> {
    storage.as_deref().ok_or(RoboDocError::MissingStorageConfig)
}

impl CaptureController {
    pub fn new(storage: Option<Box<dyn Storage>>, catalog: ChecklistCatalog) -> Self {
        Self {
            session: Session::new(),
            catalog,
            storage,
            previews: PreviewRegistry::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn bucket(&self) -> Option<&str> {
        self.storage.as_deref().map(|s| s.bucket())
    }

    // ---- screen transitions ----

    pub fn set_serial(&mut self, serial: &str) -> bool {
        self.session.set_serial(serial)
    }

    pub fn set_robot_type(&mut self, robot_type: RobotType) -> bool {
        self.session.set_robot_type(robot_type)
    }

    pub fn start(&mut self) -> bool {
        self.session.start(Utc::now())
    }

    pub fn back_to_identify(&mut self) -> bool {
        self.session.back_to_identify()
    }

    /// Load the checklist of an enabled context
    pub fn select_context(&mut self, key: &str) -> bool {
        let Some(context) = find_context(key) else {
            return false;
        };
        match self.session.select_context(context, &self.catalog) {
            Some(discarded) => {
                self.previews.revoke_photos(&discarded);
                debug!(context = key, steps = self.session.checklist().len(), "checklist loaded");
                true
            }
            None => false,
        }
    }

    pub fn next(&mut self) -> bool {
        self.session.next()
    }

    pub fn previous(&mut self) -> bool {
        self.session.previous()
    }

    pub fn back_to_checklist(&mut self) -> bool {
        self.session.back_to_checklist()
    }

    /// Explicit cancel: drop everything and start over
    pub fn cancel(&mut self) {
        let discarded = self.session.reset();
        self.previews.revoke_photos(&discarded);
    }

    // ---- storage actions ----

    /// Upload a photo for the active step.
    ///
    /// `Ok(None)` when there is nothing to do: no file, no active step, or
    /// another upload still holds the session's slot.
    #[instrument(name = "upload_photo", skip_all)]
    pub async fn upload(&mut self, file: Option<PhotoFile>) -> Result<Option<Photo>> {
        let Some(file) = file else {
            return Ok(None);
        };
        if self.session.active_step().is_none() {
            return Ok(None);
        }
        let storage = require(&self.storage)?;
        let Some(pending) = self.session.prepare_upload(Utc::now()) else {
            debug!("upload ignored, another upload is in flight");
            return Ok(None);
        };

        let mime_type = file.mime_type();
        let options = UploadOptions {
            upsert: false,
            content_type: mime_type.clone(),
        };
        info!(path = %pending.path, step = %pending.step_id, "uploading photo");

        if let Err(e) = storage.upload(&pending.path, file.bytes.clone(), options).await {
            warn!(error = %e, "upload failed");
            self.session.abort_upload(pending);
            return Err(match e.kind {
                StorageErrorKind::NotFound => RoboDocError::BucketNotFound(storage.bucket().to_string()),
                _ => RoboDocError::Storage(e),
            });
        }

        let url = storage.public_url(&pending.path).unwrap_or_default();
        let preview = self.previews.allocate(&file.bytes, &mime_type);
        let photo = self.session.complete_upload(
            pending,
            UploadedObject {
                url,
                preview: Some(preview),
                captured_at: Utc::now(),
                size_bytes: file.size_bytes(),
                mime_type,
            },
        );
        Ok(Some(photo.clone()))
    }

    /// Finalize the manifest from the summary screen.
    ///
    /// On success the session is reset. On failure it is left as it was so
    /// the operator can retry. `Ok(None)` when not on the summary screen.
    pub async fn finish(&mut self) -> Result<Option<FinalizeReport>> {
        if self.session.screen() != Screen::Summary {
            return Ok(None);
        }
        let storage = require(&self.storage)?;
        let report = finalize_manifest(storage, &self.session, Utc::now()).await?;
        self.cancel();
        Ok(Some(report))
    }
}
