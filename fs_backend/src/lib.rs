//! # Archive Backends
//!
//! This crate defines what an archive is to the filesystem service and ships
//! the two backends every configuration can use.
//!
//! ## Philosophy
//!
//! - **Capabilities, not inheritance**: Archives, files and directories are trait objects
//! - **Sessions own their backends**: An open file survives the archive that produced it
//! - **Paths are values**: [`ArchivePath`] is decoded once and never re-parsed from raw words
//!
//! ## Backends
//!
//! - [`MemoryArchiveFactory`]: in-memory tree, shared by every open of the same factory
//! - [`HostDirectoryArchiveFactory`]: a directory on the host file system

pub mod archive;
pub mod entry;
pub mod host;
pub mod memory;
pub mod mode;
pub mod path;

pub use archive::{ArchiveBackend, ArchiveFactory, DirectoryBackend, FileBackend};
pub use entry::{DirectoryEntry, ENTRY_SIZE, FILENAME_LENGTH};
pub use host::{HostArchiveError, HostDirectoryArchive, HostDirectoryArchiveFactory};
pub use memory::{MemoryArchive, MemoryArchiveFactory};
pub use mode::OpenMode;
pub use path::{ArchivePath, LowPathType, PathError};
