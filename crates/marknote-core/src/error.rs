use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures raised at the boundary between the editing core and the outside
/// world. None of them are fatal to a running session.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to list directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write settings {path}: {source}")]
    SettingsWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to render markdown")]
    Render(#[source] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
