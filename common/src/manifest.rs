//! Workflow manifest
//!
//! One JSON document per (robot type, serial, context), rebuilt from the
//! session on every finalize. Identity fields (`workflow.id`,
//! `workflow.started_at`) are kept from the first manifest written at the
//! same path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::completeness::has_photo;
use crate::error::Result;
use crate::session::Session;
use crate::types::{format_timestamp, RobotType};

pub const SCHEMA_VERSION: &str = "1.0";
pub const GENERATED_BY: &str = "robodoc";
pub const MANIFEST_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: String,
    pub workflow: WorkflowInfo,
    pub robot: RobotInfo,
    pub storage: StorageInfo,
    pub checklist: ChecklistInfo,
    pub steps: Vec<StepRecord>,
    pub summary: SummaryInfo,
    pub integrity: IntegrityInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub workflow_type: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotInfo {
    pub serial: String,
    #[serde(rename = "type")]
    pub robot_type: RobotType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub bucket: String,
    pub base_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistInfo {
    pub total_steps: usize,
    pub required_steps: usize,
    pub completed_required_steps: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_id: String,
    pub label: String,
    pub required: bool,
    pub photos: Vec<PhotoRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub file_name: String,
    pub path: String,
    pub captured_at: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryInfo {
    pub total_photos: usize,
    pub all_required_steps_completed: bool,
    /// Reserved, always null for now
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityInfo {
    pub generated_by: String,
    pub generated_at: String,
}

/// Context key as workflow type: whitespace runs to `_`, lower case
pub fn workflow_type(context_key: &str) -> String {
    context_key
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Build a fresh manifest from the session
///
/// # Arguments
/// * `session` - session at the summary screen
/// * `bucket` - bucket the photos were uploaded to
/// * `workflow_id` - id used unless an earlier manifest already has one
/// * `completed_at` - finalize time, also used as `generated_at`
pub fn build_manifest(
    session: &Session,
    bucket: &str,
    workflow_id: String,
    completed_at: DateTime<Utc>,
) -> Manifest {
    let checklist = session.checklist();
    let photos_by_step = session.photos_by_step();
    let completeness = session.completeness();
    let completed_required_steps = checklist
        .iter()
        .filter(|s| s.required && has_photo(photos_by_step, &s.id))
        .count();
    let timestamp = format_timestamp(completed_at);

    let steps = checklist
        .iter()
        .map(|step| StepRecord {
            step_id: step.id.clone(),
            label: step.label.clone(),
            required: step.required,
            photos: session
                .photos_for(&step.id)
                .iter()
                .map(|photo| PhotoRecord {
                    file_name: photo.name.clone(),
                    path: photo.path.clone(),
                    captured_at: format_timestamp(photo.captured_at),
                    size_bytes: photo.size_bytes,
                    mime_type: photo.mime_type.clone(),
                })
                .collect(),
        })
        .collect();

    Manifest {
        schema_version: SCHEMA_VERSION.to_string(),
        workflow: WorkflowInfo {
            id: workflow_id,
            workflow_type: workflow_type(session.context_key()),
            status: "completed".to_string(),
            started_at: format_timestamp(session.workflow_started_at().unwrap_or(completed_at)),
            completed_at: Some(timestamp.clone()),
        },
        robot: RobotInfo {
            serial: session.robot_serial().to_string(),
            robot_type: session.robot_type(),
        },
        storage: StorageInfo {
            bucket: bucket.to_string(),
            base_path: session.base_path(),
        },
        checklist: ChecklistInfo {
            total_steps: checklist.len(),
            required_steps: completeness.required_count,
            completed_required_steps,
        },
        steps,
        summary: SummaryInfo {
            total_photos: completeness.total_photos,
            all_required_steps_completed: completeness.complete,
            notes: None,
        },
        integrity: IntegrityInfo {
            generated_by: GENERATED_BY.to_string(),
            generated_at: timestamp,
        },
    }
}

/// Skeleton written once, out of band, so that finalize has something to
/// update. Status is `pending` until the first finalize overwrites it.
///
/// `workflow.id` and `workflow.started_at` are left empty: the first
/// finalize sets them from its session and later finalizes keep them.
pub fn seed_manifest(
    robot_type: RobotType,
    serial: &str,
    context_key: &str,
    bucket: &str,
    created_at: DateTime<Utc>,
) -> Manifest {
    let timestamp = format_timestamp(created_at);
    Manifest {
        schema_version: SCHEMA_VERSION.to_string(),
        workflow: WorkflowInfo {
            id: String::new(),
            workflow_type: workflow_type(context_key),
            status: "pending".to_string(),
            started_at: String::new(),
            completed_at: None,
        },
        robot: RobotInfo {
            serial: serial.to_string(),
            robot_type,
        },
        storage: StorageInfo {
            bucket: bucket.to_string(),
            base_path: crate::naming::base_path(robot_type, serial, context_key),
        },
        checklist: ChecklistInfo {
            total_steps: 0,
            required_steps: 0,
            completed_required_steps: 0,
        },
        steps: Vec::new(),
        summary: SummaryInfo {
            total_photos: 0,
            all_required_steps_completed: false,
            notes: None,
        },
        integrity: IntegrityInfo {
            generated_by: GENERATED_BY.to_string(),
            generated_at: timestamp,
        },
    }
}

/// Only the identity fields of a stored manifest; everything else may be
/// missing or of another shape.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredIdentity {
    workflow: Option<StoredWorkflow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoredWorkflow {
    id: Option<String>,
    started_at: Option<String>,
}

/// Carry `workflow.id` / `workflow.started_at` over from the stored bytes.
///
/// Unparseable content is discarded and `fresh` is returned unchanged.
/// Empty strings count as absent.
pub fn preserve_identity(mut fresh: Manifest, existing: &[u8]) -> Manifest {
    let Ok(stored) = serde_json::from_slice::<StoredIdentity>(existing) else {
        return fresh;
    };
    if let Some(workflow) = stored.workflow {
        if let Some(id) = workflow.id.filter(|s| !s.is_empty()) {
            fresh.workflow.id = id;
        }
        if let Some(started_at) = workflow.started_at.filter(|s| !s.is_empty()) {
            fresh.workflow.started_at = started_at;
        }
    }
    fresh
}

impl Manifest {
    /// Pretty-printed JSON payload
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
