use std::{
    fs,
    io::{self, Read as _, Write as _},
    path::{Path, PathBuf},
    thread,
    time::{Duration, SystemTime},
};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt as _;

use tracing::debug;

use crate::{Error, MAX_FILE_BYTES, Result};

const READ_ATTEMPTS: u32 = 3;
const READ_RETRY_PAUSE: Duration = Duration::from_millis(5);
const TEMP_ATTEMPTS: u32 = 10;

/// Extensions a folder entry must carry to be opened as a document.
pub const OPENABLE_EXTENSIONS: [&str; 2] = ["md", "txt"];

/// One entry of a folder listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

impl FileHandle {
    pub fn display_name(&self) -> &str {
        &self.name
    }

    pub fn is_openable(&self) -> bool {
        !self.is_dir && is_openable_path(&self.path)
    }
}

/// Whether `path` names a document type the editor opens.
pub fn is_openable_path(path: &Path) -> bool {
    OPENABLE_EXTENSIONS
        .iter()
        .any(|ext| has_extension(path, ext))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == ext)
}

/// External file operations the editing core depends on.
pub trait Storage {
    fn list(&self, folder: &Path) -> Result<Vec<FileHandle>>;
    fn read(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, text: &str) -> Result<()>;
}

/// [`Storage`] backed by the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct Disk;

impl Storage for Disk {
    fn list(&self, folder: &Path) -> Result<Vec<FileHandle>> {
        list_directory(folder).map_err(|source| Error::DirectoryRead {
            path: folder.to_path_buf(),
            source,
        })
    }

    fn read(&self, path: &Path) -> Result<String> {
        read_settled(path).map_err(|source| Error::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    fn write(&self, path: &Path, text: &str) -> Result<()> {
        atomic_write_utf8(path, text).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Single-level listing, directories first, then by name.
pub(crate) fn list_directory(folder: &Path) -> io::Result<Vec<FileHandle>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        entries.push(FileHandle {
            path: entry.path(),
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
    }

    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    debug!(folder = %folder.display(), count = entries.len(), "listed folder");
    Ok(entries)
}

/// What the metadata says about a file's contents. Two equal stamps taken
/// around a read mean nothing replaced or resized the file mid-read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
    #[cfg(unix)]
    inode: u64,
}

impl Stamp {
    fn of(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
            #[cfg(unix)]
            inode: meta.ino(),
        })
    }
}

fn too_large() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        "file exceeds the maximum editable size",
    )
}

fn read_capped(path: &Path) -> io::Result<String> {
    let mut text = String::new();
    fs::File::open(path)?
        .take(MAX_FILE_BYTES + 1)
        .read_to_string(&mut text)?;
    if text.len() as u64 > MAX_FILE_BYTES {
        return Err(too_large());
    }
    Ok(text)
}

/// Read `path` as UTF-8, retrying while the file changes under the read.
///
/// Oversized files and invalid UTF-8 fail at once; other errors are retried.
pub(crate) fn read_settled(path: &Path) -> io::Result<String> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let before = Stamp::of(path)?;
        if before.len > MAX_FILE_BYTES {
            return Err(too_large());
        }

        let read = read_capped(path);
        let settled = Stamp::of(path).is_ok_and(|after| after == before);
        let last_try = attempt >= READ_ATTEMPTS;
        match read {
            Ok(text) if settled => return Ok(text),
            Err(err) if err.kind() == io::ErrorKind::InvalidData || last_try => return Err(err),
            Ok(_) if last_try => return Err(io::Error::other("file kept changing while being read")),
            _ => thread::sleep(READ_RETRY_PAUSE),
        }
    }
}

/// Replace `path` with `contents`: write and sync a sibling temp file, then
/// rename it over the target.
pub(crate) fn atomic_write_utf8(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path is missing a file name"))?
        .to_string_lossy();

    let (tmp_path, file) = create_temp(dir, &name)?;
    let result = write_synced(file, contents).and_then(|()| replace(&tmp_path, path, dir, &name));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn unique_suffix(attempt: u32) -> String {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos());
    format!("{}-{nanos:x}-{attempt}", std::process::id())
}

fn create_temp(dir: &Path, name: &str) -> io::Result<(PathBuf, fs::File)> {
    for attempt in 0..TEMP_ATTEMPTS {
        let tmp_path = dir.join(format!(".marknote-tmp-{name}-{}", unique_suffix(attempt)));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free temporary file name",
    ))
}

fn write_synced(mut file: fs::File, contents: &str) -> io::Result<()> {
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

/// Move `tmp_path` onto `path`. Where renaming over an existing file is
/// refused, the old file is parked under a backup name and put back if the
/// second rename fails too.
fn replace(tmp_path: &Path, path: &Path, dir: &Path, name: &str) -> io::Result<()> {
    match fs::rename(tmp_path, path) {
        Ok(()) => return Ok(()),
        Err(err) if !path.exists() => return Err(err),
        Err(_) => {}
    }

    let backup = dir.join(format!(".marknote-backup-{name}-{}", unique_suffix(0)));
    fs::rename(path, &backup)?;
    match fs::rename(tmp_path, path) {
        Ok(()) => {
            let _ = fs::remove_file(&backup);
            Ok(())
        }
        Err(err) => {
            let _ = fs::rename(&backup, path);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openable_paths_are_md_and_txt_only() {
        for (path, expected) in [
            ("/notes/a.md", true),
            ("/notes/a.txt", true),
            ("/notes/a.markdown", false),
            ("/notes/a.rs", false),
            ("/notes/README", false),
            ("/notes/a.MD", false),
        ] {
            assert_eq!(is_openable_path(Path::new(path)), expected, "{path}");
        }

        let dir = FileHandle {
            path: PathBuf::from("/notes/drafts.md"),
            name: "drafts.md".to_owned(),
            is_dir: true,
        };
        assert!(!dir.is_openable());
    }

    #[test]
    fn disk_lists_directories_first_then_by_name() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok(), "{dir:?}");
        let Ok(dir) = dir else { return };
        fs::write(dir.path().join("b.md"), "b").ok();
        fs::write(dir.path().join("a.txt"), "a").ok();
        fs::create_dir(dir.path().join("zeta")).ok();

        let listed = Disk.list(dir.path()).unwrap_or_default();
        let names: Vec<_> = listed.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["zeta", "a.txt", "b.md"]);
        assert!(listed[0].is_dir);
        assert_eq!(listed[2].path, dir.path().join("b.md"));
    }

    #[test]
    fn disk_list_missing_folder_is_directory_read_error() {
        let result = Disk.list(Path::new("/tmp/marknote-missing-folder-12345"));
        assert!(matches!(result, Err(Error::DirectoryRead { .. })));
    }

    #[test]
    fn disk_read_missing_file_is_read_error() {
        let result = Disk.read(Path::new("/tmp/marknote-nonexistent-12345.md"));
        assert!(matches!(result, Err(Error::Read { .. })));
    }

    #[test]
    fn disk_read_returns_file_text() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok(), "{dir:?}");
        let Ok(dir) = dir else { return };
        let path = dir.path().join("test.md");
        fs::write(&path, "content").ok();

        let text = Disk.read(&path);
        assert!(matches!(text.as_deref(), Ok("content")), "{text:?}");
    }

    #[test]
    fn disk_read_rejects_invalid_utf8_without_retrying() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok(), "{dir:?}");
        let Ok(dir) = dir else { return };
        let path = dir.path().join("binary.md");
        fs::write(&path, [0xff, 0xfe, 0x00]).ok();

        let err = read_settled(&path).map_err(|err| err.kind());
        assert_eq!(err, Err(io::ErrorKind::InvalidData));
        assert!(matches!(Disk.read(&path), Err(Error::Read { .. })));
    }

    #[test]
    fn atomic_write_creates_and_overwrites() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok(), "{dir:?}");
        let Ok(dir) = dir else { return };
        let path = dir.path().join("test.md");

        assert!(Disk.write(&path, "first").is_ok());
        assert_eq!(fs::read_to_string(&path).unwrap_or_default(), "first");

        assert!(Disk.write(&path, "second").is_ok());
        assert_eq!(fs::read_to_string(&path).unwrap_or_default(), "second");

        let leftovers = fs::read_dir(dir.path())
            .map(|it| it.filter_map(io::Result::ok).count())
            .unwrap_or_default();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn atomic_write_rejects_missing_filename() {
        let result = Disk.write(Path::new("/"), "data");
        assert!(matches!(result, Err(Error::Write { .. })));
    }
}
