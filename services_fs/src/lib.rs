//! # Filesystem Service
//!
//! This crate implements the filesystem service core of the emulator: the
//! archive registry and the command dispatch for open files and directories.
//!
//! ## Philosophy
//!
//! - **Handles are never dangling**: The registry owns every open archive; a
//!   handle either resolves or yields `ERR_INVALID_HANDLE`
//! - **Sessions own their backends**: Closing an archive never invalidates an
//!   open file or directory
//! - **Guest-visible outcomes**: Every failure a guest can cause becomes a
//!   [`fs_result::ResultCode`] in the reply, never a panic
//!
//! ## Example
//!
//! ```
//! use fs_backend::{ArchivePath, MemoryArchiveFactory, OpenMode};
//! use services_fs::{archive_ops, ArchiveIdCode, ArchiveRegistry};
//!
//! let registry = ArchiveRegistry::new();
//! registry.register_archive(Box::new(MemoryArchiveFactory::new("SDMC")), ArchiveIdCode::Sdmc);
//!
//! let handle = registry.open_archive(ArchiveIdCode::Sdmc, &ArchivePath::Empty).unwrap();
//! archive_ops::create_file(&registry, handle, &"/save.bin".into(), 16).unwrap();
//! let path = ArchivePath::from("/save.bin");
//! let file = archive_ops::open_file(&registry, handle, &path, OpenMode::read_only());
//! assert!(file.is_ok());
//! ```

pub mod archive_ops;
pub mod command;
pub mod config;
pub mod registry;
pub mod save_data;
pub mod service;
pub mod session;

pub use command::{CommandBuffer, DirectoryCommand, FileCommand, COMMAND_BUFFER_WORDS};
pub use config::{ConfigError, FsConfig};
pub use registry::{ArchiveHandle, ArchiveIdCode, ArchivePair, ArchiveRegistry};
pub use save_data::MediaType;
pub use service::FsService;
pub use session::{DirectorySession, FileSession, NoSessionHandles, SessionHandles};
