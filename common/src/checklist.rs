//! Checklist catalog
//!
//! Static configuration keyed by context, then robot type. The built-in
//! catalog is compiled in; a JSON file with the same shape can replace it.

use crate::error::Result;
use crate::types::{ChecklistStep, RobotType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BUILTIN_CHECKLISTS: &str = include_str!("../assets/checklists.json");

/// Robot type used when a context has no dedicated list for the requested type
pub const FALLBACK_ROBOT_TYPE: RobotType = RobotType::Scara;

/// context -> robot type -> steps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistCatalog {
    contexts: BTreeMap<String, BTreeMap<String, Vec<ChecklistStep>>>,
}

impl ChecklistCatalog {
    /// Compiled-in catalog
    pub fn builtin() -> Self {
        // The embedded asset is covered by tests; an empty catalog is the
        // only sane value if it ever fails to parse.
        Self::from_json(BUILTIN_CHECKLISTS).unwrap_or_default()
    }

    /// Read from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        Ok(catalog)
    }

    /// Checklist for (context, robot type).
    ///
    /// Falls back to the SCARA list when the type has none, and to an empty
    /// list when the context is not configured at all.
    pub fn for_context(&self, context: &str, robot_type: RobotType) -> Vec<ChecklistStep> {
        let Some(by_type) = self.contexts.get(context) else {
            return Vec::new();
        };
        by_type
            .get(robot_type.as_str())
            .or_else(|| by_type.get(FALLBACK_ROBOT_TYPE.as_str()))
            .cloned()
            .unwrap_or_default()
    }

    /// Configured context keys
    pub fn context_keys(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }
}
