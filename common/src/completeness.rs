//! Checklist completeness
//!
//! Derived on demand from the checklist and the photos recorded per step.

use crate::types::{ChecklistStep, Photo};
use serde::Serialize;
use std::collections::HashMap;

/// Completeness snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Completeness {
    pub required_count: usize,
    pub missing_count: usize,
    pub total_photos: usize,
    /// true iff there is at least one required step and none is missing
    pub complete: bool,
}

impl Completeness {
    pub fn compute(checklist: &[ChecklistStep], photos_by_step: &HashMap<String, Vec<Photo>>) -> Self {
        let required: Vec<&ChecklistStep> = checklist.iter().filter(|s| s.required).collect();
        let missing_count = required
            .iter()
            .filter(|s| !has_photo(photos_by_step, &s.id))
            .count();
        let total_photos = photos_by_step.values().map(Vec::len).sum();

        Self {
            required_count: required.len(),
            missing_count,
            total_photos,
            // an empty or all-optional checklist never counts as complete
            complete: !required.is_empty() && missing_count == 0,
        }
    }

    /// Required steps that already have a photo
    pub fn completed_required(&self) -> usize {
        self.required_count - self.missing_count
    }
}

/// Whether a step has at least one photo
pub fn has_photo(photos_by_step: &HashMap<String, Vec<Photo>>, step_id: &str) -> bool {
    photos_by_step.get(step_id).is_some_and(|p| !p.is_empty())
}
