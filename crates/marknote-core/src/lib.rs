#![forbid(unsafe_code)]

//! Editing core for `marknote`: open documents, dirty tracking, debounced
//! autosave and save-all, plus the storage, settings and rendering
//! collaborators around them.

pub mod autosave;
pub mod debounce;
mod error;
pub mod markdown;
pub mod save;
pub mod session;
pub mod settings;
pub mod storage;
pub mod store;
pub mod theme;

#[cfg(test)]
mod test_support;

pub use autosave::{AUTOSAVE_DELAY, Autosave, AutosavePolicy};
pub use debounce::Debouncer;
pub use error::{Error, Result};
pub use save::{SaveOutcome, SaveReport};
pub use session::{Session, SessionOptions};
pub use settings::{Settings, SettingsStore, ViewMode};
pub use storage::{Disk, FileHandle, Storage};
pub use store::{ContentStore, Document, SaveTicket};
pub use theme::{Palette, Theme};

/// Hard cap on file sizes we will load into memory.
pub const MAX_FILE_BYTES: u64 = 64 * 1024 * 1024;
