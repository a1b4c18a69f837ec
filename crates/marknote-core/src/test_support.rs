use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    io,
    path::{Path, PathBuf},
};

use crate::{Error, FileHandle, Result, Storage};

/// In-memory [`Storage`] that records every write and can be told to fail.
#[derive(Debug, Default)]
pub(crate) struct MemoryStorage {
    files: RefCell<BTreeMap<PathBuf, String>>,
    writes: RefCell<Vec<(PathBuf, String)>>,
    reads: RefCell<Vec<PathBuf>>,
    failing_writes: RefCell<BTreeSet<PathBuf>>,
    unlistable: RefCell<BTreeSet<PathBuf>>,
}

impl MemoryStorage {
    pub(crate) fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let storage = Self::default();
        for (path, text) in files {
            storage.put(path, text);
        }
        storage
    }

    pub(crate) fn put(&self, path: &str, text: &str) {
        self.files
            .borrow_mut()
            .insert(PathBuf::from(path), text.to_owned());
    }

    pub(crate) fn contents(&self, path: &str) -> Option<String> {
        self.files.borrow().get(Path::new(path)).cloned()
    }

    pub(crate) fn fail_writes_to(&self, path: &str) {
        self.failing_writes.borrow_mut().insert(PathBuf::from(path));
    }

    pub(crate) fn allow_writes_to(&self, path: &str) {
        self.failing_writes.borrow_mut().remove(Path::new(path));
    }

    pub(crate) fn fail_listing(&self, folder: &str) {
        self.unlistable.borrow_mut().insert(PathBuf::from(folder));
    }

    pub(crate) fn writes(&self) -> Vec<(PathBuf, String)> {
        self.writes.borrow().clone()
    }

    pub(crate) fn read_count(&self, path: &str) -> usize {
        self.reads
            .borrow()
            .iter()
            .filter(|p| p.as_path() == Path::new(path))
            .count()
    }
}

impl Storage for MemoryStorage {
    fn list(&self, folder: &Path) -> Result<Vec<FileHandle>> {
        if self.unlistable.borrow().contains(folder) {
            return Err(Error::DirectoryRead {
                path: folder.to_path_buf(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }

        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|path| path.parent() == Some(folder))
            .map(|path| FileHandle {
                path: path.clone(),
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                is_dir: false,
            })
            .collect())
    }

    fn read(&self, path: &Path) -> Result<String> {
        self.reads.borrow_mut().push(path.to_path_buf());
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Read {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
    }

    fn write(&self, path: &Path, text: &str) -> Result<()> {
        if self.failing_writes.borrow().contains(path) {
            return Err(Error::Write {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }

        self.writes
            .borrow_mut()
            .push((path.to_path_buf(), text.to_owned()));
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), text.to_owned());
        Ok(())
    }
}
