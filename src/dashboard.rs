//! Storage dashboard
//!
//! Read-only drill-down robot type -> serial -> context -> files. Each level
//! is listed only once its parent is fixed; changing a selection clears every
//! level below it, including resolved previews.

use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::error::{RoboDocError, Result};
use crate::storage::{files, folders, ObjectEntry, Storage};

pub struct DashboardBrowser {
    storage: Option<Box<dyn Storage>>,
    signed_url_ttl: u64,
    robot_types: Vec<String>,
    serials: Vec<String>,
    contexts: Vec<String>,
    files: Vec<ObjectEntry>,
    selected_type: Option<String>,
    selected_serial: Option<String>,
    selected_context: Option<String>,
    /// file name -> preview URL, for image files of the selected folder
    previews: BTreeMap<String, String>,
}

impl DashboardBrowser {
    pub fn new(storage: Option<Box<dyn Storage>>, signed_url_ttl: u64) -> Self {
        Self {
            storage,
            signed_url_ttl,
            robot_types: Vec::new(),
            serials: Vec::new(),
            contexts: Vec::new(),
            files: Vec::new(),
            selected_type: None,
            selected_serial: None,
            selected_context: None,
            previews: BTreeMap::new(),
        }
    }

    fn storage(&self) -> Result<&dyn Storage> {
        self.storage.as_deref().ok_or(RoboDocError::MissingStorageConfig)
    }

    pub fn robot_types(&self) -> &[String] {
        &self.robot_types
    }

    pub fn serials(&self) -> &[String] {
        &self.serials
    }

    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }

    pub fn files(&self) -> &[ObjectEntry] {
        &self.files
    }

    pub fn selected_type(&self) -> Option<&str> {
        self.selected_type.as_deref()
    }

    pub fn selected_serial(&self) -> Option<&str> {
        self.selected_serial.as_deref()
    }

    pub fn selected_context(&self) -> Option<&str> {
        self.selected_context.as_deref()
    }

    pub fn preview_url(&self, file_name: &str) -> Option<&str> {
        self.previews.get(file_name).map(String::as_str)
    }

    pub fn preview_count(&self) -> usize {
        self.previews.len()
    }

    /// Selected levels joined, e.g. `SCARA/2525`
    fn selected_prefix(&self) -> String {
        [&self.selected_type, &self.selected_serial, &self.selected_context]
            .into_iter()
            .map_while(|s| s.as_deref())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// `{bucket}/{selected parts}/`
    pub fn active_path(&self) -> String {
        let bucket = self.storage.as_deref().map(|s| s.bucket()).unwrap_or_default();
        let prefix = self.selected_prefix();
        if prefix.is_empty() {
            format!("{}/", bucket)
        } else {
            format!("{}/{}/", bucket, prefix)
        }
    }

    /// Top level: robot type folders
    #[instrument(name = "dashboard_load_root", skip(self))]
    pub async fn load_robot_types(&mut self) -> Result<()> {
        let entries = self.storage()?.list("").await?;
        self.robot_types = folders(&entries);
        Ok(())
    }

    /// Select a robot type and list its serials. `false` if not an option.
    pub async fn select_robot_type(&mut self, name: &str) -> Result<bool> {
        if !self.robot_types.iter().any(|t| t == name) {
            return Ok(false);
        }
        self.selected_type = Some(name.to_string());
        self.clear_below_type();
        let entries = self.storage()?.list(name).await?;
        self.serials = folders(&entries);
        Ok(true)
    }

    /// Select a serial and list its contexts
    pub async fn select_serial(&mut self, name: &str) -> Result<bool> {
        if self.selected_type.is_none() || !self.serials.iter().any(|s| s == name) {
            return Ok(false);
        }
        self.selected_serial = Some(name.to_string());
        self.clear_below_serial();
        let prefix = self.selected_prefix();
        let entries = self.storage()?.list(&prefix).await?;
        self.contexts = folders(&entries);
        Ok(true)
    }

    /// Select a context and list its files
    pub async fn select_context(&mut self, name: &str) -> Result<bool> {
        if self.selected_serial.is_none() || !self.contexts.iter().any(|c| c == name) {
            return Ok(false);
        }
        self.selected_context = Some(name.to_string());
        self.clear_below_context();
        let prefix = self.selected_prefix();
        let entries = self.storage()?.list(&prefix).await?;
        self.files = files(&entries);
        debug!(folder = %prefix, files = self.files.len(), "files listed");
        Ok(true)
    }

    fn clear_below_type(&mut self) {
        self.selected_serial = None;
        self.serials.clear();
        self.clear_below_serial();
    }

    fn clear_below_serial(&mut self) {
        self.selected_context = None;
        self.contexts.clear();
        self.clear_below_context();
    }

    fn clear_below_context(&mut self) {
        self.files.clear();
        self.previews.clear();
    }

    fn object_path(&self, file_name: &str) -> Option<String> {
        self.selected_context
            .as_ref()
            .map(|_| format!("{}/{}", self.selected_prefix(), file_name))
    }

    /// URL to open a file: signed first, public as fallback
    #[instrument(name = "dashboard_open_file", skip(self))]
    pub async fn open_file(&self, file_name: &str) -> Result<String> {
        let storage = self.storage()?;
        let path = self
            .object_path(file_name)
            .ok_or_else(|| RoboDocError::NoFileUrl(file_name.to_string()))?;
        let url = resolve_url(storage, &path, self.signed_url_ttl).await;
        url.ok_or(RoboDocError::NoFileUrl(path))
    }

    /// Resolve preview URLs for every image file of the selected folder
    #[instrument(name = "dashboard_previews", skip(self))]
    pub async fn resolve_previews(&mut self) -> Result<usize> {
        let storage = self.storage()?;
        let targets: Vec<(String, String)> = self
            .files
            .iter()
            .filter(|f| f.is_image())
            .filter_map(|f| self.object_path(&f.name).map(|p| (f.name.clone(), p)))
            .collect();

        let ttl = self.signed_url_ttl;
        let resolved = join_all(targets.iter().map(|(name, path)| async move {
            resolve_url(storage, path, ttl).await.map(|url| (name.clone(), url))
        }))
        .await;

        self.previews = resolved.into_iter().flatten().collect();
        Ok(self.previews.len())
    }
}

async fn resolve_url(storage: &dyn Storage, path: &str, ttl: u64) -> Option<String> {
    match storage.create_signed_url(path, ttl).await {
        Ok(url) if !url.is_empty() => return Some(url),
        Ok(_) => {}
        Err(e) => debug!(error = %e, path, "signed url unavailable, trying public url"),
    }
    storage.public_url(path).filter(|u| !u.is_empty())
}
