//! Object naming
//!
//! Photo objects are named
//! `{serial}_{context}_{step token}_{index}_{timestamp}.jpg`
//! and live under `{robot type}/{serial}/{context}/`.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::types::{format_timestamp, RobotType};

/// Manifest object name inside a base path
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Turn a step label into a file name token.
///
/// Rules, applied in order:
/// 1. drop parenthesised groups `(...)`
/// 2. en/em dashes become `-`
/// 3. drop everything except ASCII letters, digits, whitespace and `-`
/// 4. trim
/// 5. whitespace runs become `_`
/// 6. dash runs become a single `-`
pub fn format_step_for_name(label: &str) -> String {
    lazy_static::lazy_static! {
        static ref PARENS_RE: Regex = Regex::new(r"\(.*?\)").unwrap();
        static ref LONG_DASH_RE: Regex = Regex::new(r"[–—]").unwrap();
        static ref DISALLOWED_RE: Regex = Regex::new(r"[^a-zA-Z0-9\s-]").unwrap();
        static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
        static ref DASHES_RE: Regex = Regex::new(r"-+").unwrap();
    }

    let s = PARENS_RE.replace_all(label, "");
    let s = LONG_DASH_RE.replace_all(&s, "-");
    let s = DISALLOWED_RE.replace_all(&s, "");
    let s = WHITESPACE_RE.replace_all(s.trim(), "_");
    DASHES_RE.replace_all(&s, "-").into_owned()
}

/// Timestamp part of a file name: RFC 3339 with `:` and `.` replaced by `-`
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    format_timestamp(at).replace([':', '.'], "-")
}

/// Photo object name
pub fn generate_file_name(
    serial: &str,
    context: &str,
    step_token: &str,
    index: usize,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{}_{}_{}_{}_{}.jpg",
        serial,
        context,
        step_token,
        index,
        file_timestamp(at)
    )
}

/// `{robot type}/{serial}/{context}`
pub fn base_path(robot_type: RobotType, serial: &str, context: &str) -> String {
    format!("{}/{}/{}", robot_type, serial, context)
}

/// `{base path}/manifest.json`
pub fn manifest_path(base_path: &str) -> String {
    format!("{}/{}", base_path, MANIFEST_FILE_NAME)
}
