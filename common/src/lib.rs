//! RoboDoc Common Library
//!
//! Storage-independent core shared by the CLI front end:
//! session state machine, checklist catalog, object naming,
//! completeness and manifest construction.

pub mod types;
pub mod error;
pub mod checklist;
pub mod naming;
pub mod completeness;
pub mod session;
pub mod manifest;

pub use types::{ChecklistStep, Photo, RobotType, WorkflowContext, CONTEXTS, find_context, format_timestamp, require_context};
pub use error::{Error, Result};
pub use checklist::ChecklistCatalog;
pub use completeness::Completeness;
pub use session::{PendingUpload, Screen, Session, UploadedObject};
pub use manifest::{Manifest, build_manifest, preserve_identity, seed_manifest};
