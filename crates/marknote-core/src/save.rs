use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::{ContentStore, Result, Storage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The document was written and its baseline moved to what was written.
    Saved,
    /// Nothing to write; the document already matches its baseline.
    Clean,
    /// No document is open at that path.
    NotOpen,
}

/// Result of saving one document as part of a larger save.
#[derive(Debug)]
pub struct SaveReport {
    pub path: PathBuf,
    pub result: Result<SaveOutcome>,
}

impl SaveReport {
    pub fn is_success(&self) -> bool {
        matches!(self.result, Ok(SaveOutcome::Saved | SaveOutcome::Clean))
    }
}

/// Write `path` if it has unsaved changes.
///
/// The write uses a snapshot of the current content and the baseline is moved
/// to that same snapshot. A failed write leaves the document dirty so the
/// user can retry.
pub fn save_one<S>(store: &mut ContentStore, storage: &S, path: &Path) -> Result<SaveOutcome>
where
    S: Storage + ?Sized,
{
    if !store.contains(path) {
        warn!(path = %path.display(), "save requested for a document that is not open");
        return Ok(SaveOutcome::NotOpen);
    }
    if !store.is_dirty(path) {
        return Ok(SaveOutcome::Clean);
    }
    let Some(ticket) = store.begin_save(path) else {
        return Ok(SaveOutcome::NotOpen);
    };

    if let Err(err) = storage.write(ticket.path(), ticket.content()) {
        warn!(path = %path.display(), error = %err, "save failed");
        return Err(err);
    }

    info!(path = %path.display(), bytes = ticket.content().len(), "saved");
    store.complete_save(ticket);
    Ok(SaveOutcome::Saved)
}

/// Save every document that is dirty when this is called, one at a time.
///
/// The dirty set is taken once up front. A failure on one document does not
/// stop the others.
pub fn save_all<S>(store: &mut ContentStore, storage: &S) -> Vec<SaveReport>
where
    S: Storage + ?Sized,
{
    let batch = store.dirty_paths();
    info!(count = batch.len(), "saving all modified documents");

    batch
        .into_iter()
        .map(|path| {
            let result = save_one(store, storage, &path);
            SaveReport { path, result }
        })
        .collect()
}
