//! Path-level archive operations
//!
//! Each operation resolves its archive handle(s) before touching a backend;
//! a handle that is not open yields `ERR_INVALID_HANDLE` with no side effects.

use crate::registry::{ArchiveHandle, ArchiveIdCode, ArchivePair, ArchiveRegistry};
use crate::session::{DirectorySession, FileSession};
use fs_backend::{ArchiveBackend, ArchivePath, OpenMode};
use fs_result::{
    unimplemented_function, ErrorModule, ResultVal, ERR_DIRECTORY_NOT_FOUND, ERR_FILE_NOT_FOUND,
    ERR_INVALID_HANDLE, ERR_OPERATION_CANCELED, ERR_RENAME_FAILED,
};
use tracing::{debug, error};

fn with_archive<R>(
    registry: &ArchiveRegistry,
    handle: ArchiveHandle,
    f: impl FnOnce(&dyn ArchiveBackend) -> ResultVal<R>,
) -> ResultVal<R> {
    registry
        .with_archive(handle, f)
        .unwrap_or(Err(ERR_INVALID_HANDLE))
}

fn canceled_unless(done: bool) -> ResultVal<()> {
    // TODO: replace with the hardware-reported code once it is known
    if done {
        Ok(())
    } else {
        Err(ERR_OPERATION_CANCELED)
    }
}

/// Opens a file in an open archive as a new session
pub fn open_file(
    registry: &ArchiveRegistry,
    handle: ArchiveHandle,
    path: &ArchivePath,
    mode: OpenMode,
) -> ResultVal<FileSession> {
    with_archive(registry, handle, |archive| {
        let backend = archive.open_file(path, mode).ok_or(ERR_FILE_NOT_FOUND)?;
        debug!(%handle, %path, %mode, "opened file");
        Ok(FileSession::new(backend, path.clone()))
    })
}

/// Opens a directory in an open archive as a new session
pub fn open_directory(
    registry: &ArchiveRegistry,
    handle: ArchiveHandle,
    path: &ArchivePath,
) -> ResultVal<DirectorySession> {
    with_archive(registry, handle, |archive| {
        let backend = archive
            .open_directory(path)
            .ok_or(ERR_DIRECTORY_NOT_FOUND)?;
        debug!(%handle, %path, "opened directory");
        Ok(DirectorySession::new(backend, path.clone()))
    })
}

pub fn delete_file(
    registry: &ArchiveRegistry,
    handle: ArchiveHandle,
    path: &ArchivePath,
) -> ResultVal<()> {
    with_archive(registry, handle, |archive| {
        canceled_unless(archive.delete_file(path))
    })
}

pub fn delete_directory(
    registry: &ArchiveRegistry,
    handle: ArchiveHandle,
    path: &ArchivePath,
) -> ResultVal<()> {
    with_archive(registry, handle, |archive| {
        canceled_unless(archive.delete_directory(path))
    })
}

/// Creates a zero-filled file; the backend's result is passed through
pub fn create_file(
    registry: &ArchiveRegistry,
    handle: ArchiveHandle,
    path: &ArchivePath,
    size: u64,
) -> ResultVal<()> {
    with_archive(registry, handle, |archive| archive.create_file(path, size))
}

pub fn create_directory(
    registry: &ArchiveRegistry,
    handle: ArchiveHandle,
    path: &ArchivePath,
) -> ResultVal<()> {
    with_archive(registry, handle, |archive| {
        canceled_unless(archive.create_directory(path))
    })
}

/// Renames within one archive; moving between archives is unimplemented
fn rename(
    registry: &ArchiveRegistry,
    src_handle: ArchiveHandle,
    dst_handle: ArchiveHandle,
    op: impl FnOnce(&dyn ArchiveBackend) -> bool,
) -> ResultVal<()> {
    let result = registry.with_archive_pair(src_handle, dst_handle, |pair| match pair {
        ArchivePair::Same(archive) => {
            if op(archive) {
                Ok(())
            } else {
                Err(ERR_RENAME_FAILED)
            }
        }
        ArchivePair::Distinct(..) => {
            error!(%src_handle, %dst_handle, "rename across archives is unimplemented");
            Err(unimplemented_function(ErrorModule::Fs))
        }
    });
    result.unwrap_or(Err(ERR_INVALID_HANDLE))
}

pub fn rename_file(
    registry: &ArchiveRegistry,
    src_handle: ArchiveHandle,
    src_path: &ArchivePath,
    dst_handle: ArchiveHandle,
    dst_path: &ArchivePath,
) -> ResultVal<()> {
    rename(registry, src_handle, dst_handle, |archive| {
        archive.rename_file(src_path, dst_path)
    })
}

pub fn rename_directory(
    registry: &ArchiveRegistry,
    src_handle: ArchiveHandle,
    src_path: &ArchivePath,
    dst_handle: ArchiveHandle,
    dst_path: &ArchivePath,
) -> ResultVal<()> {
    rename(registry, src_handle, dst_handle, |archive| {
        archive.rename_directory(src_path, dst_path)
    })
}

/// Formats the archive kind `id_code` selects, through its factory
pub fn format_archive(
    registry: &ArchiveRegistry,
    id_code: ArchiveIdCode,
    path: &ArchivePath,
) -> ResultVal<()> {
    registry
        .with_factory(id_code, |factory| {
            debug!(?id_code, %path, "formatting archive");
            factory.format(path)
        })
        .unwrap_or(Err(unimplemented_function(ErrorModule::Fs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_backend::MemoryArchiveFactory;
    use fs_result::ERR_ALREADY_EXISTS;

    fn setup() -> (ArchiveRegistry, ArchiveHandle) {
        let registry = ArchiveRegistry::new();
        registry.register_archive(
            Box::new(MemoryArchiveFactory::new("SDMC")),
            ArchiveIdCode::Sdmc,
        );
        let handle = registry
            .open_archive(ArchiveIdCode::Sdmc, &ArchivePath::Empty)
            .unwrap();
        (registry, handle)
    }

    #[test]
    fn test_missing_handle_rejected_everywhere() {
        let (registry, _) = setup();
        let bad = ArchiveHandle::from_raw(0xDEAD);
        let path = ArchivePath::from("/a");
        assert!(matches!(
            open_file(&registry, bad, &path, OpenMode::read_write_create()),
            Err(ERR_INVALID_HANDLE)
        ));
        assert!(matches!(
            open_directory(&registry, bad, &path),
            Err(ERR_INVALID_HANDLE)
        ));
        assert_eq!(delete_file(&registry, bad, &path), Err(ERR_INVALID_HANDLE));
        assert_eq!(
            delete_directory(&registry, bad, &path),
            Err(ERR_INVALID_HANDLE)
        );
        assert_eq!(
            create_file(&registry, bad, &path, 0),
            Err(ERR_INVALID_HANDLE)
        );
        assert_eq!(
            create_directory(&registry, bad, &path),
            Err(ERR_INVALID_HANDLE)
        );
    }

    #[test]
    fn test_open_missing_file() {
        let (registry, handle) = setup();
        let result = open_file(&registry, handle, &"/nope".into(), OpenMode::read_only());
        assert!(matches!(result, Err(ERR_FILE_NOT_FOUND)));
        let result = open_directory(&registry, handle, &"/nope".into());
        assert!(matches!(result, Err(ERR_DIRECTORY_NOT_FOUND)));
    }

    #[test]
    fn test_backend_refusals_map_to_canceled() {
        let (registry, handle) = setup();
        assert_eq!(
            delete_file(&registry, handle, &"/nope".into()),
            Err(ERR_OPERATION_CANCELED)
        );
        assert_eq!(
            delete_directory(&registry, handle, &"/nope".into()),
            Err(ERR_OPERATION_CANCELED)
        );
        assert_eq!(create_directory(&registry, handle, &"/d".into()), Ok(()));
        assert_eq!(
            create_directory(&registry, handle, &"/d".into()),
            Err(ERR_OPERATION_CANCELED)
        );
    }

    #[test]
    fn test_create_file_result_passed_through() {
        let (registry, handle) = setup();
        assert_eq!(create_file(&registry, handle, &"/a".into(), 4), Ok(()));
        assert_eq!(
            create_file(&registry, handle, &"/a".into(), 4),
            Err(ERR_ALREADY_EXISTS)
        );
    }

    #[test]
    fn test_rename_failure_code() {
        let (registry, handle) = setup();
        let result = rename_file(&registry, handle, &"/a".into(), handle, &"/b".into());
        assert_eq!(result, Err(ERR_RENAME_FAILED));
    }

    #[test]
    fn test_rename_directory_within_archive() {
        let (registry, handle) = setup();
        create_directory(&registry, handle, &"/old".into()).unwrap();
        let result = rename_directory(&registry, handle, &"/old".into(), handle, &"/new".into());
        assert_eq!(result, Ok(()));
        assert!(open_directory(&registry, handle, &"/new".into()).is_ok());
    }

    #[test]
    fn test_rename_with_missing_destination_handle() {
        let (registry, handle) = setup();
        create_file(&registry, handle, &"/a".into(), 0).unwrap();
        let bad = ArchiveHandle::from_raw(0xBEEF);
        let result = rename_file(&registry, handle, &"/a".into(), bad, &"/b".into());
        assert_eq!(result, Err(ERR_INVALID_HANDLE));
        assert!(open_file(&registry, handle, &"/a".into(), OpenMode::read_only()).is_ok());
    }

    #[test]
    fn test_format_archive() {
        let (registry, handle) = setup();
        create_file(&registry, handle, &"/a".into(), 0).unwrap();
        assert_eq!(
            format_archive(&registry, ArchiveIdCode::Sdmc, &ArchivePath::Empty),
            Ok(())
        );
        assert!(open_file(&registry, handle, &"/a".into(), OpenMode::read_only()).is_err());
        assert_eq!(
            format_archive(&registry, ArchiveIdCode::RomFs, &ArchivePath::Empty),
            Err(unimplemented_function(ErrorModule::Fs))
        );
    }
}
