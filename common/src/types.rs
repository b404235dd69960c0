//! Session data model
//!
//! - RobotType: which robot family is being documented
//! - WorkflowContext: lifecycle phase that selects the checklist
//! - ChecklistStep: one documentation item
//! - Photo: one uploaded object attached to a step

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::Error;

/// Robot family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotType {
    #[default]
    #[serde(rename = "SCARA")]
    Scara,
    #[serde(rename = "IVR")]
    Ivr,
}

impl RobotType {
    pub const ALL: [RobotType; 2] = [RobotType::Scara, RobotType::Ivr];

    /// Folder and manifest spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotType::Scara => "SCARA",
            RobotType::Ivr => "IVR",
        }
    }
}

impl fmt::Display for RobotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RobotType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SCARA" => Ok(RobotType::Scara),
            "IVR" => Ok(RobotType::Ivr),
            _ => Err(format!("Unknown robot type: {}. Use SCARA or IVR", s)),
        }
    }
}

/// Workflow context (lifecycle phase)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowContext {
    pub key: &'static str,
    pub label: &'static str,
    pub enabled: bool,
}

/// Built-in contexts. Only enabled ones can load a checklist.
pub const CONTEXTS: &[WorkflowContext] = &[
    WorkflowContext { key: "Incoming", label: "Incoming Goods", enabled: true },
    WorkflowContext { key: "Analysis", label: "Analysis", enabled: false },
    WorkflowContext { key: "Assembly", label: "Assembly", enabled: false },
    WorkflowContext { key: "Delivery", label: "Delivery", enabled: false },
];

/// Look up a built-in context by key (case-insensitive)
pub fn find_context(key: &str) -> Option<&'static WorkflowContext> {
    CONTEXTS.iter().find(|c| c.key.eq_ignore_ascii_case(key.trim()))
}

/// Ensure a context key exists, for CLI arguments
pub fn require_context(key: &str) -> crate::Result<&'static WorkflowContext> {
    find_context(key).ok_or_else(|| Error::Config(format!("unknown context: {}", key)))
}

/// One checklist item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistStep {
    /// Step id; the catalog may write it as a number
    #[serde(deserialize_with = "deserialize_step_id")]
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

impl ChecklistStep {
    pub fn new(id: impl Into<String>, label: impl Into<String>, required: bool) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            required,
        }
    }
}

fn deserialize_step_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(u64),
        Str(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Num(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}

/// Uploaded photo
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    /// Object name (file name part of the path)
    pub name: String,
    /// Object path inside the bucket
    pub path: String,
    /// Public URL, empty when the backend has none
    pub url: String,
    /// Local preview handle, released when the photo is discarded
    pub preview: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub mime_type: String,
}

/// RFC 3339 UTC with millisecond precision (`2026-10-16T08:15:30.123Z`)
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
