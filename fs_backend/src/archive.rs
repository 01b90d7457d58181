//! Backend capability contracts
//!
//! Every archive kind implements these traits. The service core holds only
//! trait objects and never names a concrete backend.

use crate::{ArchivePath, DirectoryEntry, OpenMode};
use fs_result::ResultVal;

/// Produces open archive instances for one archive kind
pub trait ArchiveFactory: Send + Sync {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Opens the archive selected by `path`
    fn open(&self, path: &ArchivePath) -> ResultVal<Box<dyn ArchiveBackend>>;

    /// Erases and re-creates the archive selected by `path`
    fn format(&self, path: &ArchivePath) -> ResultVal<()>;
}

/// An open archive
///
/// Operations reporting `bool` or `Option` carry no failure detail; the caller
/// picks the result code.
pub trait ArchiveBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Opens a file; the returned backend is independent of this archive's lifetime
    fn open_file(&self, path: &ArchivePath, mode: OpenMode) -> Option<Box<dyn FileBackend>>;

    /// Opens a directory for enumeration
    fn open_directory(&self, path: &ArchivePath) -> Option<Box<dyn DirectoryBackend>>;

    fn delete_file(&self, path: &ArchivePath) -> bool;

    fn delete_directory(&self, path: &ArchivePath) -> bool;

    /// Creates a zero-filled file of `size` bytes
    fn create_file(&self, path: &ArchivePath, size: u64) -> ResultVal<()>;

    fn create_directory(&self, path: &ArchivePath) -> bool;

    fn rename_file(&self, src: &ArchivePath, dst: &ArchivePath) -> bool;

    fn rename_directory(&self, src: &ArchivePath, dst: &ArchivePath) -> bool;
}

/// An open file
pub trait FileBackend: Send {
    /// Reads up to `buf.len()` bytes at `offset`, returning the count read
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> usize;

    /// Writes `buf` at `offset`, returning the count written
    fn write(&mut self, offset: u64, flush: bool, buf: &[u8]) -> usize;

    fn size(&self) -> u64;

    fn set_size(&mut self, size: u64);

    fn flush(&mut self);

    fn close(&mut self);
}

/// An open directory with its own read cursor
pub trait DirectoryBackend: Send {
    /// Fills `entries` from the cursor, returning how many were produced
    ///
    /// Returns 0 once the directory is exhausted.
    fn read(&mut self, entries: &mut [DirectoryEntry]) -> usize;

    fn close(&mut self);
}
