//! Host-directory archive
//!
//! Maps an archive onto a directory of the host file system, the way the SD
//! card archive is stored. Archive paths are confined to the mount point:
//! `.` and `..` components are rejected before touching the host.

use crate::{
    ArchiveBackend, ArchiveFactory, ArchivePath, DirectoryBackend, DirectoryEntry, FileBackend,
    OpenMode, PathError,
};
use fs_result::{ResultVal, ERR_ALREADY_EXISTS, ERR_FILE_NOT_FOUND, ERR_GENERIC};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while touching the host file system
#[derive(Debug, Error)]
pub enum HostArchiveError {
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HostArchiveError {
    fn io(path: &Path, source: io::Error) -> Self {
        HostArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn resolve(root: &Path, path: &ArchivePath) -> Result<PathBuf, HostArchiveError> {
    let mut host = root.to_path_buf();
    for component in path.components()? {
        host.push(component);
    }
    Ok(host)
}

/// Factory rooted at a host directory
pub struct HostDirectoryArchiveFactory {
    name: String,
    mount_point: PathBuf,
}

impl HostDirectoryArchiveFactory {
    pub fn new(name: impl Into<String>, mount_point: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            mount_point: mount_point.into(),
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Creates the mount point if it is missing
    pub fn initialize(&self) -> Result<(), HostArchiveError> {
        fs::create_dir_all(&self.mount_point)
            .map_err(|e| HostArchiveError::io(&self.mount_point, e))?;
        debug!(name = %self.name, mount_point = %self.mount_point.display(), "host archive ready");
        Ok(())
    }
}

impl ArchiveFactory for HostDirectoryArchiveFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, path: &ArchivePath) -> ResultVal<Box<dyn ArchiveBackend>> {
        if !path.is_valid() || !self.mount_point.is_dir() {
            return Err(ERR_FILE_NOT_FOUND);
        }
        Ok(Box::new(HostDirectoryArchive {
            name: self.name.clone(),
            root: self.mount_point.clone(),
        }))
    }

    fn format(&self, _path: &ArchivePath) -> ResultVal<()> {
        let reset = || -> io::Result<()> {
            if self.mount_point.exists() {
                fs::remove_dir_all(&self.mount_point)?;
            }
            fs::create_dir_all(&self.mount_point)
        };
        reset().map_err(|e| {
            warn!(mount_point = %self.mount_point.display(), error = %e, "format failed");
            ERR_GENERIC
        })
    }
}

/// One open host-directory archive
pub struct HostDirectoryArchive {
    name: String,
    root: PathBuf,
}

impl HostDirectoryArchive {
    fn host_path(&self, path: &ArchivePath) -> Option<PathBuf> {
        match resolve(&self.root, path) {
            Ok(host) => Some(host),
            Err(e) => {
                debug!(archive = %self.name, %path, error = %e, "rejected path");
                None
            }
        }
    }

    fn report(&self, operation: &str, result: Result<(), HostArchiveError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!(archive = %self.name, operation, error = %e, "host operation failed");
                false
            }
        }
    }
}

impl ArchiveBackend for HostDirectoryArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn open_file(&self, path: &ArchivePath, mode: OpenMode) -> Option<Box<dyn FileBackend>> {
        let host = self.host_path(path)?;
        if host.is_dir() {
            return None;
        }
        if mode.contains(OpenMode::CREATE) && !host.exists() {
            let created = OpenOptions::new().write(true).create_new(true).open(&host);
            if let Err(e) = created {
                debug!(path = %host.display(), error = %e, "create on open failed");
                return None;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(mode.can_write())
            .open(&host);
        match file {
            Ok(file) => Some(Box::new(HostFile {
                file: Some(file),
                mode,
                path: host,
            })),
            Err(e) => {
                debug!(path = %host.display(), error = %e, "open file failed");
                None
            }
        }
    }

    fn open_directory(&self, path: &ArchivePath) -> Option<Box<dyn DirectoryBackend>> {
        let host = self.host_path(path)?;
        match read_entries(&host) {
            Ok(entries) => Some(Box::new(HostDirectory { entries, cursor: 0 })),
            Err(e) => {
                debug!(error = %e, "open directory failed");
                None
            }
        }
    }

    fn delete_file(&self, path: &ArchivePath) -> bool {
        let Some(host) = self.host_path(path) else {
            return false;
        };
        let result = fs::remove_file(&host).map_err(|e| HostArchiveError::io(&host, e));
        self.report("delete_file", result)
    }

    fn delete_directory(&self, path: &ArchivePath) -> bool {
        let Some(host) = self.host_path(path) else {
            return false;
        };
        if host == self.root {
            return false;
        }
        let result = fs::remove_dir(&host).map_err(|e| HostArchiveError::io(&host, e));
        self.report("delete_directory", result)
    }

    fn create_file(&self, path: &ArchivePath, size: u64) -> ResultVal<()> {
        let host = self.host_path(path).ok_or(ERR_FILE_NOT_FOUND)?;
        if host.exists() {
            return Err(ERR_ALREADY_EXISTS);
        }
        let created = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&host)
            .and_then(|file| file.set_len(size));
        created.map_err(|e| {
            debug!(path = %host.display(), error = %e, "create file failed");
            match e.kind() {
                io::ErrorKind::NotFound => ERR_FILE_NOT_FOUND,
                io::ErrorKind::AlreadyExists => ERR_ALREADY_EXISTS,
                _ => ERR_GENERIC,
            }
        })
    }

    fn create_directory(&self, path: &ArchivePath) -> bool {
        let Some(host) = self.host_path(path) else {
            return false;
        };
        let result = fs::create_dir(&host).map_err(|e| HostArchiveError::io(&host, e));
        self.report("create_directory", result)
    }

    fn rename_file(&self, src: &ArchivePath, dst: &ArchivePath) -> bool {
        let (Some(src), Some(dst)) = (self.host_path(src), self.host_path(dst)) else {
            return false;
        };
        if !src.is_file() || dst.exists() {
            return false;
        }
        let result = fs::rename(&src, &dst).map_err(|e| HostArchiveError::io(&src, e));
        self.report("rename_file", result)
    }

    fn rename_directory(&self, src: &ArchivePath, dst: &ArchivePath) -> bool {
        let (Some(src), Some(dst)) = (self.host_path(src), self.host_path(dst)) else {
            return false;
        };
        if src == self.root || !src.is_dir() || dst.exists() || dst.starts_with(&src) {
            return false;
        }
        let result = fs::rename(&src, &dst).map_err(|e| HostArchiveError::io(&src, e));
        self.report("rename_directory", result)
    }
}

fn read_entries(dir: &Path) -> Result<Vec<DirectoryEntry>, HostArchiveError> {
    let mut entries = Vec::new();
    for item in fs::read_dir(dir).map_err(|e| HostArchiveError::io(dir, e))? {
        let item = item.map_err(|e| HostArchiveError::io(dir, e))?;
        let metadata = item
            .metadata()
            .map_err(|e| HostArchiveError::io(&item.path(), e))?;
        let name = item.file_name().to_string_lossy().into_owned();
        let mut entry = if metadata.is_dir() {
            DirectoryEntry::directory(name)
        } else {
            DirectoryEntry::file(name, metadata.len())
        };
        entry.is_hidden = entry.name.starts_with('.');
        entry.is_read_only = metadata.permissions().readonly();
        entries.push(entry);
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

struct HostFile {
    /// `None` once closed
    file: Option<File>,
    mode: OpenMode,
    path: PathBuf,
}

impl HostFile {
    fn warn_on(&self, operation: &str, e: io::Error) {
        warn!(path = %self.path.display(), operation, error = %e, "host file operation failed");
    }
}

impl FileBackend for HostFile {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> usize {
        let Some(file) = self.file.as_mut() else {
            return 0;
        };
        let result = file.seek(SeekFrom::Start(offset)).and_then(|_| {
            let mut total = 0;
            while total < buf.len() {
                match file.read(&mut buf[total..]) {
                    Ok(0) => break,
                    Ok(n) => total += n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            Ok(total)
        });
        result.unwrap_or_else(|e| {
            self.warn_on("read", e);
            0
        })
    }

    fn write(&mut self, offset: u64, flush: bool, buf: &[u8]) -> usize {
        if !self.mode.can_write() {
            return 0;
        }
        let Some(file) = self.file.as_mut() else {
            return 0;
        };
        let result = file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| file.write_all(buf))
            .and_then(|_| if flush { file.flush() } else { Ok(()) });
        match result {
            Ok(()) => buf.len(),
            Err(e) => {
                self.warn_on("write", e);
                0
            }
        }
    }

    fn size(&self) -> u64 {
        self.file
            .as_ref()
            .and_then(|file| file.metadata().ok())
            .map(|metadata| metadata.len())
            .unwrap_or(0)
    }

    fn set_size(&mut self, size: u64) {
        if !self.mode.can_write() {
            return;
        }
        if let Some(Err(e)) = self.file.as_ref().map(|file| file.set_len(size)) {
            self.warn_on("set_size", e);
        }
    }

    fn flush(&mut self) {
        if let Some(Err(e)) = self.file.as_mut().map(|file| file.flush()) {
            self.warn_on("flush", e);
        }
    }

    fn close(&mut self) {
        self.file = None;
    }
}

struct HostDirectory {
    entries: Vec<DirectoryEntry>,
    cursor: usize,
}

impl DirectoryBackend for HostDirectory {
    fn read(&mut self, entries: &mut [DirectoryEntry]) -> usize {
        let remaining = &self.entries[self.cursor..];
        let count = remaining.len().min(entries.len());
        entries[..count].clone_from_slice(&remaining[..count]);
        self.cursor += count;
        count
    }

    fn close(&mut self) {
        self.cursor = self.entries.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn archive(dir: &TempDir) -> Box<dyn ArchiveBackend> {
        let factory = HostDirectoryArchiveFactory::new("SDMC", dir.path());
        factory.initialize().unwrap();
        factory.open(&ArchivePath::Empty).unwrap()
    }

    #[test]
    fn test_initialize_creates_mount_point() {
        let dir = TempDir::new().unwrap();
        let mount = dir.path().join("sdmc");
        let factory = HostDirectoryArchiveFactory::new("SDMC", &mount);
        assert!(factory.open(&ArchivePath::Empty).is_err());
        factory.initialize().unwrap();
        assert!(mount.is_dir());
        assert!(factory.open(&ArchivePath::Empty).is_ok());
    }

    #[test]
    fn test_create_write_read() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);
        archive.create_file(&"/a.bin".into(), 16).unwrap();
        assert_eq!(fs::metadata(dir.path().join("a.bin")).unwrap().len(), 16);

        let mut file = archive
            .open_file(&"/a.bin".into(), OpenMode::read_write())
            .unwrap();
        assert_eq!(file.write(2, true, &[1, 2, 3]), 3);
        let mut buf = [0xFF; 5];
        assert_eq!(file.read(0, &mut buf), 5);
        assert_eq!(buf, [0, 0, 1, 2, 3]);
        assert_eq!(file.read(20, &mut buf), 0);
    }

    #[test]
    fn test_create_existing_file_fails() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);
        archive.create_file(&"/a.bin".into(), 0).unwrap();
        assert_eq!(
            archive.create_file(&"/a.bin".into(), 0),
            Err(ERR_ALREADY_EXISTS)
        );
    }

    #[test]
    fn test_escape_attempt_rejected() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);
        assert!(archive
            .open_file(&"/../outside".into(), OpenMode::read_write_create())
            .is_none());
        assert_eq!(
            archive.create_file(&"/../outside".into(), 0),
            Err(ERR_FILE_NOT_FOUND)
        );
    }

    #[test]
    fn test_set_size_and_close() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);
        let mut file = archive
            .open_file(&"/s.bin".into(), OpenMode::read_write_create())
            .unwrap();
        file.set_size(300);
        assert_eq!(file.size(), 300);
        file.close();
        assert_eq!(file.size(), 0);
        assert_eq!(file.write(0, false, &[1]), 0);
    }

    #[test]
    fn test_create_only_mode_cannot_modify() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);
        let mut file = archive
            .open_file(&"/c.bin".into(), OpenMode::CREATE)
            .unwrap();
        assert!(dir.path().join("c.bin").is_file());
        assert_eq!(file.write(0, false, &[1]), 0);
        file.set_size(32);
        assert_eq!(file.size(), 0);

        let mut reader = archive
            .open_file(&"/c.bin".into(), OpenMode::read_only())
            .unwrap();
        reader.set_size(8);
        assert_eq!(fs::metadata(dir.path().join("c.bin")).unwrap().len(), 0);
    }

    #[test]
    fn test_directory_listing_sorted() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);
        assert!(archive.create_directory(&"/zeta".into()));
        archive.create_file(&"/alpha.txt".into(), 4).unwrap();

        let mut listing = archive.open_directory(&"/".into()).unwrap();
        let mut entries = vec![DirectoryEntry::default(); 1];
        assert_eq!(listing.read(&mut entries), 1);
        assert_eq!(entries[0].name, "alpha.txt");
        assert_eq!(entries[0].file_size, 4);
        assert_eq!(listing.read(&mut entries), 1);
        assert_eq!(entries[0].name, "zeta");
        assert!(entries[0].is_directory);
        assert_eq!(listing.read(&mut entries), 0);
    }

    #[test]
    fn test_rename_and_delete() {
        let dir = TempDir::new().unwrap();
        let archive = archive(&dir);
        archive.create_file(&"/a".into(), 0).unwrap();
        assert!(archive.rename_file(&"/a".into(), &"/b".into()));
        assert!(!archive.delete_file(&"/a".into()));
        assert!(archive.delete_file(&"/b".into()));

        assert!(archive.create_directory(&"/d".into()));
        assert!(archive.rename_directory(&"/d".into(), &"/e".into()));
        assert!(!archive.rename_directory(&"/e".into(), &"/e/inner".into()));
        assert!(archive.delete_directory(&"/e".into()));
        assert!(!archive.delete_directory(&"/".into()));
    }

    #[test]
    fn test_format_empties_mount_point() {
        let dir = TempDir::new().unwrap();
        let factory = HostDirectoryArchiveFactory::new("SDMC", dir.path().join("m"));
        factory.initialize().unwrap();
        fs::write(dir.path().join("m/junk"), b"x").unwrap();
        factory.format(&ArchivePath::Empty).unwrap();
        assert!(dir.path().join("m").is_dir());
        assert!(!dir.path().join("m/junk").exists());
    }
}
