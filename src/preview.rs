//! Local photo previews
//!
//! Each successful upload keeps an in-memory `data:` URL of the photo so the
//! checklist screen can show it without a round trip. Handles must be
//! revoked when the photo is discarded, otherwise the registry grows for the
//! whole process lifetime.

use base64::Engine;
use robodoc_common::Photo;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{RoboDocError, Result};

const DEFAULT_MIME: &str = "image/jpeg";

/// A photo picked by the operator, not yet uploaded
#[derive(Debug, Clone)]
pub struct PhotoFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Declared type, if the source had one
    pub declared_mime: Option<String>,
}

impl PhotoFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RoboDocError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            declared_mime: None,
            name,
            bytes,
        })
    }

    /// Sniffed image type, then the declared type, then `image/jpeg`
    pub fn mime_type(&self) -> String {
        if let Ok(format) = image::guess_format(&self.bytes) {
            return format.to_mime_type().to_string();
        }
        self.declared_mime
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME.to_string())
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Preview handle registry
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next_id: u64,
    entries: HashMap<String, String>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle for the given bytes
    pub fn allocate(&mut self, bytes: &[u8], mime_type: &str) -> String {
        self.next_id += 1;
        let handle = format!("preview:{}", self.next_id);
        let data_url = format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes)
        );
        self.entries.insert(handle.clone(), data_url);
        handle
    }

    /// Data URL of a live handle
    pub fn resolve(&self, handle: &str) -> Option<&str> {
        self.entries.get(handle).map(String::as_str)
    }

    pub fn revoke(&mut self, handle: &str) -> bool {
        self.entries.remove(handle).is_some()
    }

    /// Release the previews of discarded photos
    pub fn revoke_photos(&mut self, photos: &[Photo]) -> usize {
        photos
            .iter()
            .filter_map(|p| p.preview.as_deref())
            .filter(|h| self.revoke(h))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
