use std::{
    collections::{BTreeSet, HashMap, hash_map::Entry},
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::Result;

/// An editable document: what the user sees and what was last persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    current: String,
    original: String,
}

impl Document {
    fn loaded(path: PathBuf, text: String) -> Self {
        Self {
            path,
            original: text.clone(),
            current: text,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Recomputed on every call; there is no cached flag to go stale.
    pub fn is_dirty(&self) -> bool {
        self.current != self.original
    }
}

/// Content captured for a write. Completing it records exactly this content
/// as the saved baseline, whatever the document holds by then.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use = "a save ticket must be completed once its write succeeds"]
pub struct SaveTicket {
    path: PathBuf,
    content: String,
}

impl SaveTicket {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Every document opened during a folder session, keyed by path.
#[derive(Debug, Default)]
pub struct ContentStore {
    docs: HashMap<PathBuf, Document>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the document at `path`, loading it only if it is not open yet.
    ///
    /// An already-open document is returned untouched, so unsaved edits are
    /// never replaced by what is on disk. A failed load creates nothing.
    pub fn open<L>(&mut self, path: &Path, load: L) -> Result<&Document>
    where
        L: FnOnce(&Path) -> Result<String>,
    {
        match self.docs.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let text = load(path)?;
                debug!(path = %path.display(), bytes = text.len(), "loaded document");
                let doc = Document::loaded(entry.key().clone(), text);
                Ok(&*entry.insert(doc))
            }
        }
    }

    /// Replace the current content of an open document.
    ///
    /// Returns `false` when `path` is not open, which callers never expect.
    pub fn update(&mut self, path: &Path, content: impl Into<String>) -> bool {
        let Some(doc) = self.docs.get_mut(path) else {
            warn!(path = %path.display(), "edit for a document that is not open");
            return false;
        };
        doc.current = content.into();
        true
    }

    pub fn get(&self, path: &Path) -> Option<&Document> {
        self.docs.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.docs.contains_key(path)
    }

    pub fn is_dirty(&self, path: &Path) -> bool {
        self.docs.get(path).is_some_and(Document::is_dirty)
    }

    pub fn dirty_paths(&self) -> BTreeSet<PathBuf> {
        self.docs
            .values()
            .filter(|doc| doc.is_dirty())
            .map(|doc| doc.path.clone())
            .collect()
    }

    /// Record `saved` as what is now on disk for `path`.
    ///
    /// `saved` must be the content that was written, not a fresh read of the
    /// document, or an edit made during the write would be marked clean.
    pub fn mark_saved(&mut self, path: &Path, saved: impl Into<String>) {
        match self.docs.get_mut(path) {
            Some(doc) => doc.original = saved.into(),
            None => warn!(path = %path.display(), "save for a document that is not open"),
        }
    }

    /// Snapshot the current content of `path` for writing.
    pub fn begin_save(&self, path: &Path) -> Option<SaveTicket> {
        self.docs.get(path).map(|doc| SaveTicket {
            path: doc.path.clone(),
            content: doc.current.clone(),
        })
    }

    /// Finish a successful write started with [`Self::begin_save`].
    pub fn complete_save(&mut self, ticket: SaveTicket) {
        let SaveTicket { path, content } = ticket;
        self.mark_saved(&path, content);
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn close_all(&mut self) {
        debug!(count = self.docs.len(), "closing all documents");
        self.docs.clear();
    }
}
