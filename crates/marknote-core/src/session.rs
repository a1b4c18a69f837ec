use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
    AUTOSAVE_DELAY, Autosave, AutosavePolicy, ContentStore, Document, FileHandle, Result,
    SaveOutcome, SaveReport, Settings, Storage, markdown, save, storage::is_openable_path,
};

/// Session tuning that is not part of the persisted [`Settings`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    pub autosave_delay: Duration,
    pub autosave_policy: AutosavePolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autosave_delay: AUTOSAVE_DELAY,
            autosave_policy: AutosavePolicy::default(),
        }
    }
}

/// Editing state for one window: the open folder, every document opened
/// from it, which one is focused, and the pending autosaves.
///
/// Operations that can arm or fire autosave timers take the current time, so
/// the caller's event loop (or a test) decides what "now" is.
#[derive(Debug)]
pub struct Session<S> {
    storage: S,
    settings: Settings,
    folder: Option<PathBuf>,
    entries: Vec<FileHandle>,
    active: Option<PathBuf>,
    store: ContentStore,
    autosave: Autosave,
    sidebar_visible: bool,
    last_error: Option<String>,
}

impl<S: Storage> Session<S> {
    pub fn new(storage: S, settings: Settings) -> Self {
        Self::with_options(storage, settings, SessionOptions::default())
    }

    pub fn with_options(storage: S, settings: Settings, options: SessionOptions) -> Self {
        Self {
            storage,
            settings,
            folder: None,
            entries: Vec::new(),
            active: None,
            store: ContentStore::new(),
            autosave: Autosave::new(options.autosave_policy, options.autosave_delay),
            sidebar_visible: true,
            last_error: None,
        }
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply new settings. Turning autosave off drops every pending autosave;
    /// turning it on schedules documents that already have unsaved edits.
    pub fn set_settings(&mut self, settings: Settings, now: Instant) {
        match (self.settings.auto_save, settings.auto_save) {
            (true, false) => {
                debug!("autosave disabled, cancelling pending saves");
                self.autosave.cancel_all();
            }
            (false, true) => {
                let dirty = self.store.dirty_paths();
                debug!(dirty = dirty.len(), "autosave enabled");
                self.autosave.resume(
                    dirty.iter().map(PathBuf::as_path),
                    self.active.as_deref(),
                    now,
                );
            }
            _ => {}
        }
        self.settings = settings;
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn entries(&self) -> &[FileHandle] {
        &self.entries
    }

    /// Make `folder` the browsed folder and list it.
    ///
    /// A listing failure shows an empty folder. Documents opened earlier stay
    /// open; only [`Self::close_folder`] discards them.
    pub fn open_folder(&mut self, folder: impl Into<PathBuf>) -> &[FileHandle] {
        let folder = folder.into();
        info!(folder = %folder.display(), "opening folder");
        self.folder = Some(folder);
        self.refresh();
        &self.entries
    }

    /// Re-list the open folder.
    pub fn refresh(&mut self) {
        let Some(folder) = self.folder.as_deref() else {
            return;
        };
        self.entries = match self.storage.list(folder) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "folder listing failed");
                Vec::new()
            }
        };
    }

    /// Forget the folder and every document opened from it.
    ///
    /// Pending autosaves are cancelled first so none fires into the cleared
    /// store. Unsaved edits are discarded.
    pub fn close_folder(&mut self) {
        info!(
            folder = ?self.folder.as_deref().map(Path::display),
            dirty = self.store.dirty_paths().len(),
            "closing folder"
        );
        self.autosave.cancel_all();
        self.store.close_all();
        self.folder = None;
        self.entries.clear();
        self.active = None;
        self.sidebar_visible = true;
        self.last_error = None;
    }

    /// Focus `path`, opening it first if needed.
    ///
    /// Paths that are not `.md`/`.txt` are ignored and yield `Ok(None)`. If
    /// the file cannot be read no document is created and the focus does not
    /// move.
    pub fn select(&mut self, path: &Path) -> Result<Option<&Document>> {
        if !is_openable_path(path) {
            debug!(path = %path.display(), "ignoring unsupported file type");
            return Ok(None);
        }

        let storage = &self.storage;
        if let Err(err) = self.store.open(path, |p| storage.read(p)) {
            warn!(error = %err, "open failed");
            self.last_error = Some(format!("Open failed: {err}"));
            return Err(err);
        }

        self.active = Some(path.to_path_buf());
        Ok(self.store.get(path))
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_deref()
    }

    pub fn active_document(&self) -> Option<&Document> {
        self.store.get(self.active.as_deref()?)
    }

    pub fn document(&self, path: &Path) -> Option<&Document> {
        self.store.get(path)
    }

    pub const fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Replace the content of the active document.
    pub fn edit(&mut self, text: impl Into<String>, now: Instant) -> bool {
        let Some(path) = self.active.clone() else {
            warn!("edit with no active document");
            return false;
        };
        self.edit_path(&path, text, now)
    }

    /// Replace the content of an open document and reschedule its autosave.
    pub fn edit_path(&mut self, path: &Path, text: impl Into<String>, now: Instant) -> bool {
        if !self.store.update(path, text) {
            return false;
        }

        if self.settings.auto_save {
            if self.store.is_dirty(path) {
                self.autosave.arm(path, now);
            } else {
                self.autosave.cancel(path, self.active.as_deref());
            }
        }
        true
    }

    pub fn is_dirty(&self, path: &Path) -> bool {
        self.store.is_dirty(path)
    }

    pub fn is_active_dirty(&self) -> bool {
        self.active
            .as_deref()
            .is_some_and(|path| self.store.is_dirty(path))
    }

    pub fn dirty_paths(&self) -> BTreeSet<PathBuf> {
        self.store.dirty_paths()
    }

    /// Save one document now, superseding any pending autosave for it.
    pub fn save(&mut self, path: &Path) -> Result<SaveOutcome> {
        self.autosave.cancel(path, self.active.as_deref());
        let result = save::save_one(&mut self.store, &self.storage, path);
        match &result {
            Ok(SaveOutcome::Saved) => self.last_error = None,
            Ok(_) => {}
            Err(err) => self.last_error = Some(format!("Save failed: {err}")),
        }
        result
    }

    /// Save the focused document, the usual Cmd/Ctrl+S.
    pub fn save_active(&mut self) -> Result<SaveOutcome> {
        match self.active.clone() {
            Some(path) => self.save(&path),
            None => Ok(SaveOutcome::NotOpen),
        }
    }

    /// Save every document that is dirty right now.
    pub fn save_all(&mut self) -> Vec<SaveReport> {
        for path in self.store.dirty_paths() {
            self.autosave.cancel(&path, self.active.as_deref());
        }
        let reports = save::save_all(&mut self.store, &self.storage);
        self.note_failures(&reports);
        reports
    }

    /// Run any autosaves that are due at `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<SaveReport> {
        let due = self.autosave.take_due(now, self.active.as_deref());
        if due.is_empty() || !self.settings.auto_save {
            return Vec::new();
        }

        let mut reports = Vec::with_capacity(due.len());
        for path in due {
            if !self.store.is_dirty(&path) {
                continue;
            }
            debug!(path = %path.display(), "autosaving");
            let result = save::save_one(&mut self.store, &self.storage, &path);
            reports.push(SaveReport { path, result });
        }
        self.note_failures(&reports);
        reports
    }

    /// When the next autosave is due, for sleeping the event loop.
    pub fn next_autosave(&self) -> Option<Instant> {
        self.autosave.next_deadline()
    }

    pub fn has_pending_autosave(&self) -> bool {
        self.autosave.has_pending()
    }

    /// Rendered preview of the active document.
    pub fn preview_html(&self) -> String {
        self.active_document()
            .map(|doc| markdown::preview_html(doc.current()))
            .unwrap_or_default()
    }

    pub const fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    pub const fn toggle_sidebar(&mut self) {
        self.sidebar_visible = !self.sidebar_visible;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn note_failures(&mut self, reports: &[SaveReport]) {
        if let Some(err) = reports.iter().find_map(|r| r.result.as_ref().err()) {
            self.last_error = Some(format!("Save failed: {err}"));
        }
    }
}
