//! Guided capture session
//!
//! Screens: Identify -> ContextSelect -> Checklist -> Summary, plus reset.
//!
//! Actions that are not allowed in the current state return `false` / `None`
//! and leave the session untouched. They are disabled actions, not errors.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::checklist::ChecklistCatalog;
use crate::completeness::{has_photo, Completeness};
use crate::naming::{base_path, format_step_for_name, generate_file_name, manifest_path};
use crate::types::{ChecklistStep, Photo, RobotType, WorkflowContext};

/// Current screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Identify,
    ContextSelect,
    Checklist,
    Summary,
}

impl Screen {
    pub fn index(&self) -> u8 {
        match self {
            Screen::Identify => 0,
            Screen::ContextSelect => 1,
            Screen::Checklist => 2,
            Screen::Summary => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Identify => "Start / Identification",
            Screen::ContextSelect => "Context Selection",
            Screen::Checklist => "Checklist",
            Screen::Summary => "Summary / Completeness",
        }
    }
}

/// An upload that holds the session's in-flight slot.
///
/// Produced by [`Session::prepare_upload`] and handed back through
/// [`Session::complete_upload`] or [`Session::abort_upload`].
#[derive(Debug, PartialEq, Eq)]
pub struct PendingUpload {
    pub step_id: String,
    pub file_name: String,
    pub path: String,
    pub index: usize,
}

/// Result data of a successful upload
#[derive(Debug, Clone)]
pub struct UploadedObject {
    pub url: String,
    pub preview: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub mime_type: String,
}

/// State of one guided run
#[derive(Debug, Clone, Default)]
pub struct Session {
    screen: Screen,
    robot_serial: String,
    robot_type: RobotType,
    context_key: String,
    workflow_started_at: Option<DateTime<Utc>>,
    checklist: Vec<ChecklistStep>,
    current_step_index: usize,
    photos_by_step: HashMap<String, Vec<Photo>>,
    /// Single in-flight slot for the whole session
    uploading_step: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn robot_serial(&self) -> &str {
        &self.robot_serial
    }

    pub fn robot_type(&self) -> RobotType {
        self.robot_type
    }

    pub fn context_key(&self) -> &str {
        &self.context_key
    }

    pub fn workflow_started_at(&self) -> Option<DateTime<Utc>> {
        self.workflow_started_at
    }

    pub fn checklist(&self) -> &[ChecklistStep] {
        &self.checklist
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn photos_by_step(&self) -> &HashMap<String, Vec<Photo>> {
        &self.photos_by_step
    }

    /// Photos of one step in capture order
    pub fn photos_for(&self, step_id: &str) -> &[Photo] {
        self.photos_by_step.get(step_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn completeness(&self) -> Completeness {
        Completeness::compute(&self.checklist, &self.photos_by_step)
    }

    /// `{robot type}/{serial}/{context}`
    pub fn base_path(&self) -> String {
        base_path(self.robot_type, &self.robot_serial, &self.context_key)
    }

    pub fn manifest_path(&self) -> String {
        manifest_path(&self.base_path())
    }

    // ---- Identify ----

    /// Serial input; only editable on the identification screen
    pub fn set_serial(&mut self, serial: &str) -> bool {
        if self.screen != Screen::Identify {
            return false;
        }
        self.robot_serial = serial.to_string();
        true
    }

    pub fn set_robot_type(&mut self, robot_type: RobotType) -> bool {
        if self.screen != Screen::Identify {
            return false;
        }
        self.robot_type = robot_type;
        true
    }

    pub fn can_start(&self) -> bool {
        self.screen == Screen::Identify && !self.robot_serial.trim().is_empty()
    }

    /// Identify -> ContextSelect; stamps the workflow start time
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if !self.can_start() {
            return false;
        }
        self.workflow_started_at = Some(now);
        self.screen = Screen::ContextSelect;
        true
    }

    // ---- ContextSelect ----

    /// ContextSelect -> Identify
    pub fn back_to_identify(&mut self) -> bool {
        if self.screen != Screen::ContextSelect {
            return false;
        }
        self.screen = Screen::Identify;
        true
    }

    /// ContextSelect -> Checklist.
    ///
    /// Returns the photos discarded by the switch (so their previews can be
    /// released), or `None` when the context is disabled or the session is
    /// on another screen.
    pub fn select_context(
        &mut self,
        context: &WorkflowContext,
        catalog: &ChecklistCatalog,
    ) -> Option<Vec<Photo>> {
        if self.screen != Screen::ContextSelect || !context.enabled {
            return None;
        }
        self.context_key = context.key.to_string();
        self.checklist = catalog.for_context(context.key, self.robot_type);
        self.current_step_index = 0;
        let discarded = self.drain_photos();
        self.screen = Screen::Checklist;
        Some(discarded)
    }

    // ---- Checklist ----

    /// Step at the current index (none on an empty checklist)
    pub fn active_step(&self) -> Option<&ChecklistStep> {
        if self.screen != Screen::Checklist {
            return None;
        }
        self.checklist.get(self.current_step_index)
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step_index + 1 >= self.checklist.len()
    }

    /// Whether an upload currently holds the slot for this step
    pub fn is_uploading(&self, step_id: &str) -> bool {
        self.uploading_step.as_deref() == Some(step_id)
    }

    pub fn upload_in_flight(&self) -> bool {
        self.uploading_step.is_some()
    }

    /// Next is disabled while the active step is required without a photo,
    /// or while an upload for it is running.
    pub fn can_go_next(&self) -> bool {
        if self.screen != Screen::Checklist {
            return false;
        }
        match self.active_step() {
            Some(step) => {
                !self.is_uploading(&step.id)
                    && !(step.required && !has_photo(&self.photos_by_step, &step.id))
            }
            None => true,
        }
    }

    /// Advance one step, or move to Summary from the last step
    pub fn next(&mut self) -> bool {
        if !self.can_go_next() {
            return false;
        }
        if self.is_last_step() {
            self.screen = Screen::Summary;
        } else {
            self.current_step_index += 1;
        }
        true
    }

    /// Go back one step, or to ContextSelect from the first step
    pub fn previous(&mut self) -> bool {
        if self.screen != Screen::Checklist {
            return false;
        }
        if self.current_step_index > 0 {
            self.current_step_index -= 1;
        } else {
            self.screen = Screen::ContextSelect;
        }
        true
    }

    /// Reserve the in-flight slot for the active step and derive the object
    /// name. `None` when there is no active step or an upload is running.
    pub fn prepare_upload(&mut self, now: DateTime<Utc>) -> Option<PendingUpload> {
        if self.upload_in_flight() {
            return None;
        }
        let step = self.active_step()?;
        let step_id = step.id.clone();
        let token = format_step_for_name(&step.label);
        // photos are never removed, so the index is never reused
        let index = self.photos_for(&step_id).len() + 1;
        let file_name = generate_file_name(&self.robot_serial, &self.context_key, &token, index, now);
        let path = format!("{}/{}", self.base_path(), file_name);

        self.uploading_step = Some(step_id.clone());
        Some(PendingUpload {
            step_id,
            file_name,
            path,
            index,
        })
    }

    /// Record a successful upload and release the slot
    pub fn complete_upload(&mut self, pending: PendingUpload, object: UploadedObject) -> &Photo {
        self.release_slot(&pending.step_id);
        let photos = self.photos_by_step.entry(pending.step_id).or_default();
        photos.push(Photo {
            name: pending.file_name,
            path: pending.path,
            url: object.url,
            preview: object.preview,
            captured_at: object.captured_at,
            size_bytes: object.size_bytes,
            mime_type: object.mime_type,
        });
        &photos[photos.len() - 1]
    }

    /// Release the slot after a failed upload
    pub fn abort_upload(&mut self, pending: PendingUpload) {
        self.release_slot(&pending.step_id);
    }

    fn release_slot(&mut self, step_id: &str) {
        if self.is_uploading(step_id) {
            self.uploading_step = None;
        }
    }

    // ---- Summary ----

    /// Summary -> Checklist at the last visited step
    pub fn back_to_checklist(&mut self) -> bool {
        if self.screen != Screen::Summary {
            return false;
        }
        self.screen = Screen::Checklist;
        true
    }

    /// Back to the initial state. Returns the discarded photos.
    pub fn reset(&mut self) -> Vec<Photo> {
        let discarded = self.drain_photos();
        *self = Self::default();
        discarded
    }

    fn drain_photos(&mut self) -> Vec<Photo> {
        let mut step_ids: Vec<String> = self.photos_by_step.keys().cloned().collect();
        step_ids.sort();
        step_ids
            .into_iter()
            .filter_map(|id| self.photos_by_step.remove(&id))
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CONTEXTS;
    use chrono::TimeZone;

    fn catalog() -> ChecklistCatalog {
        ChecklistCatalog::from_json(
            r#"{"Incoming": {"SCARA": [
                {"id": 1, "label": "Inspect Arm", "required": true},
                {"id": 2, "label": "Check Cables", "required": false}
            ]}}"#,
        )
        .unwrap()
    }

    fn incoming() -> &'static WorkflowContext {
        &CONTEXTS[0]
    }

    fn at(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, sec).unwrap()
    }

    fn object() -> UploadedObject {
        UploadedObject {
            url: "https://example.test/p.jpg".to_string(),
            preview: None,
            captured_at: at(0),
            size_bytes: 42,
            mime_type: "image/jpeg".to_string(),
        }
    }

    fn on_checklist() -> Session {
        let mut session = Session::new();
        session.set_serial("2525");
        assert!(session.start(at(0)));
        assert!(session.select_context(incoming(), &catalog()).is_some());
        session
    }

    fn upload(session: &mut Session, sec: u32) -> PendingUpload {
        session.prepare_upload(at(sec)).expect("slot available")
    }

    #[test]
    fn test_start_requires_trimmed_serial() {
        let mut session = Session::new();
        session.set_serial("   ");
        assert!(!session.can_start());
        assert!(!session.start(at(0)));
        assert_eq!(session.screen(), Screen::Identify);

        session.set_serial(" 2525 ");
        assert!(session.start(at(5)));
        assert_eq!(session.screen(), Screen::ContextSelect);
        assert_eq!(session.workflow_started_at(), Some(at(5)));
    }

    #[test]
    fn test_identity_frozen_after_start() {
        let mut session = Session::new();
        session.set_serial("2525");
        session.start(at(0));
        assert!(!session.set_serial("9999"));
        assert!(!session.set_robot_type(RobotType::Ivr));
        assert_eq!(session.robot_serial(), "2525");
        assert!(session.back_to_identify());
        assert!(session.set_robot_type(RobotType::Ivr));
    }

    #[test]
    fn test_disabled_context_is_rejected() {
        let mut session = Session::new();
        session.set_serial("2525");
        session.start(at(0));
        let analysis = &CONTEXTS[1];
        assert!(!analysis.enabled);
        assert!(session.select_context(analysis, &catalog()).is_none());
        assert_eq!(session.screen(), Screen::ContextSelect);
    }

    #[test]
    fn test_select_context_loads_checklist() {
        let session = on_checklist();
        assert_eq!(session.screen(), Screen::Checklist);
        assert_eq!(session.context_key(), "Incoming");
        assert_eq!(session.checklist().len(), 2);
        assert_eq!(session.active_step().unwrap().label, "Inspect Arm");
    }

    #[test]
    fn test_next_blocked_on_required_step_without_photo() {
        let mut session = on_checklist();
        assert_eq!(
            session.completeness(),
            Completeness { required_count: 1, missing_count: 1, total_photos: 0, complete: false }
        );
        assert!(!session.can_go_next());
        assert!(!session.next());
        assert_eq!(session.current_step_index(), 0);
    }

    #[test]
    fn test_next_blocked_while_uploading() {
        let mut session = on_checklist();
        let first = upload(&mut session, 1);
        session.complete_upload(first, object());
        let pending = upload(&mut session, 2);
        assert!(session.is_uploading("1"));
        assert!(!session.can_go_next());
        session.abort_upload(pending);
        assert!(session.can_go_next());
    }

    #[test]
    fn test_walk_to_summary_and_back() {
        let mut session = on_checklist();
        let pending = upload(&mut session, 1);
        session.complete_upload(pending, object());
        assert_eq!(
            session.completeness(),
            Completeness { required_count: 1, missing_count: 0, total_photos: 1, complete: true }
        );

        assert!(session.next());
        assert_eq!(session.current_step_index(), 1);
        // optional step, no photo needed
        assert!(session.next());
        assert_eq!(session.screen(), Screen::Summary);
        assert_eq!(session.current_step_index(), 1);

        assert!(session.back_to_checklist());
        assert_eq!(session.screen(), Screen::Checklist);
        assert_eq!(session.current_step_index(), 1);
    }

    #[test]
    fn test_previous_from_first_step_returns_to_context() {
        let mut session = on_checklist();
        assert!(session.previous());
        assert_eq!(session.screen(), Screen::ContextSelect);
    }

    #[test]
    fn test_reselect_context_clears_photos() {
        let mut session = on_checklist();
        let pending = upload(&mut session, 1);
        session.complete_upload(pending, object());
        session.previous();
        let discarded = session.select_context(incoming(), &catalog()).unwrap();
        assert_eq!(discarded.len(), 1);
        assert_eq!(session.completeness().total_photos, 0);
        assert_eq!(session.current_step_index(), 0);
    }

    #[test]
    fn test_file_index_increments_per_step() {
        let mut session = on_checklist();
        for expected in 1..=3 {
            let pending = upload(&mut session, expected as u32);
            assert_eq!(pending.index, expected);
            assert!(pending.file_name.starts_with(&format!("2525_Incoming_Inspect_Arm_{}_", expected)));
            assert!(pending.path.starts_with("SCARA/2525/Incoming/"));
            session.complete_upload(pending, object());
        }
        session.next();
        let pending = upload(&mut session, 9);
        assert_eq!(pending.index, 1);
        assert!(pending.file_name.contains("_Check_Cables_1_"));
    }

    #[test]
    fn test_failed_upload_does_not_consume_index() {
        let mut session = on_checklist();
        let pending = upload(&mut session, 1);
        session.abort_upload(pending);
        assert_eq!(upload(&mut session, 2).index, 1);
    }

    #[test]
    fn test_second_upload_rejected_while_in_flight() {
        let mut session = on_checklist();
        let _pending = upload(&mut session, 1);
        assert!(session.prepare_upload(at(2)).is_none());
    }

    #[test]
    fn test_photos_keep_insertion_order() {
        let mut session = on_checklist();
        let mut names = Vec::new();
        for sec in 1..=3 {
            let pending = upload(&mut session, sec);
            names.push(pending.file_name.clone());
            session.complete_upload(pending, object());
        }
        let recorded: Vec<_> = session.photos_for("1").iter().map(|p| p.name.clone()).collect();
        assert_eq!(recorded, names);
    }

    #[test]
    fn test_empty_checklist_can_reach_summary() {
        let mut session = Session::new();
        session.set_serial("2525");
        session.start(at(0));
        session.select_context(incoming(), &ChecklistCatalog::default()).unwrap();
        assert!(session.active_step().is_none());
        assert!(session.prepare_upload(at(1)).is_none());
        assert!(session.next());
        assert_eq!(session.screen(), Screen::Summary);
        assert!(!session.completeness().complete);
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let mut session = Session::new();
        session.set_serial("7001");
        session.set_robot_type(RobotType::Ivr);
        session.start(at(0));
        session.select_context(incoming(), &catalog()).unwrap();
        assert_eq!(session.checklist().len(), 2);
        let pending = upload(&mut session, 1);
        assert!(pending.path.starts_with("IVR/7001/Incoming/"));
        session.complete_upload(pending, object());
        let discarded = session.reset();
        assert_eq!(discarded.len(), 1);
        assert_eq!(session.screen(), Screen::Identify);
        assert_eq!(session.robot_serial(), "");
        assert_eq!(session.robot_type(), RobotType::Scara);
        assert!(session.workflow_started_at().is_none());
        assert!(session.checklist().is_empty());
        assert!(!session.upload_in_flight());
    }

    #[test]
    fn test_manifest_path() {
        let session = on_checklist();
        assert_eq!(session.manifest_path(), "SCARA/2525/Incoming/manifest.json");
    }
}
