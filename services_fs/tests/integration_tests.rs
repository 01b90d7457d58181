//! Integration tests for the filesystem service

use fs_backend::{ArchivePath, MemoryArchiveFactory, OpenMode};
use fs_result::{
    unimplemented_function, ErrorModule, ResultCode, ERR_FILE_NOT_FOUND, ERR_INVALID_HANDLE,
};
use guest_memory::{FlatGuestMemory, GuestMemory};
use services_fs::{
    archive_ops, ArchiveHandle, ArchiveIdCode, ArchiveRegistry, CommandBuffer, DirectoryCommand,
    FileCommand, FileSession, FsConfig, FsService, MediaType, NoSessionHandles,
};
use tempfile::TempDir;

const BUFFER: u32 = 0x1000_0000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn memory_registry() -> ArchiveRegistry {
    let registry = ArchiveRegistry::new();
    registry.register_archive(
        Box::new(MemoryArchiveFactory::new("SDMC")),
        ArchiveIdCode::Sdmc,
    );
    registry.register_archive(
        Box::new(MemoryArchiveFactory::new("SaveData")),
        ArchiveIdCode::SaveData,
    );
    registry
}

fn open(registry: &ArchiveRegistry, id_code: ArchiveIdCode) -> ArchiveHandle {
    registry.open_archive(id_code, &ArchivePath::Empty).unwrap()
}

fn write(
    session: &mut FileSession,
    memory: &mut FlatGuestMemory,
    offset: u64,
    data: &[u8],
) -> u32 {
    memory
        .write_bytes(BUFFER, data.len())
        .unwrap()
        .copy_from_slice(data);
    let mut cmd = CommandBuffer::from_words(&[
        FileCommand::Write.header(),
        offset as u32,
        (offset >> 32) as u32,
        data.len() as u32,
        1,
        0,
        BUFFER,
    ]);
    session
        .dispatch(&mut cmd, memory, &mut NoSessionHandles)
        .unwrap();
    assert_eq!(cmd.status(), ResultCode::SUCCESS);
    cmd.word(2)
}

fn read(
    session: &mut FileSession,
    memory: &mut FlatGuestMemory,
    offset: u64,
    len: usize,
) -> Vec<u8> {
    let mut cmd = CommandBuffer::from_words(&[
        FileCommand::Read.header(),
        offset as u32,
        (offset >> 32) as u32,
        len as u32,
        0,
        BUFFER,
    ]);
    session
        .dispatch(&mut cmd, memory, &mut NoSessionHandles)
        .unwrap();
    assert_eq!(cmd.status(), ResultCode::SUCCESS);
    let count = cmd.word(2) as usize;
    memory.read_bytes(BUFFER, count).unwrap().to_vec()
}

#[test]
fn test_create_write_read_round_trip() {
    init_tracing();
    let registry = memory_registry();
    let handle = open(&registry, ArchiveIdCode::Sdmc);
    let mut memory = FlatGuestMemory::with_region(BUFFER, 0x1000);

    archive_ops::create_file(&registry, handle, &"/data.bin".into(), 128).unwrap();
    let mut session =
        archive_ops::open_file(&registry, handle, &"/data.bin".into(), OpenMode::read_write())
            .unwrap();

    assert_eq!(write(&mut session, &mut memory, 0, &[1, 2, 3, 4]), 4);
    memory.write_bytes(BUFFER, 4).unwrap().fill(0);
    assert_eq!(read(&mut session, &mut memory, 0, 4), vec![1, 2, 3, 4]);

    let mut whole = vec![1, 2, 3, 4];
    whole.resize(128, 0);
    assert_eq!(read(&mut session, &mut memory, 0, 256), whole);

    let mut cmd = CommandBuffer::from_words(&[FileCommand::GetSize.header()]);
    session
        .dispatch(&mut cmd, &mut memory, &mut NoSessionHandles)
        .unwrap();
    assert_eq!(cmd.read_u64(2), 128);
}

#[test]
fn test_rename_within_archive() {
    let registry = memory_registry();
    let handle = open(&registry, ArchiveIdCode::Sdmc);
    archive_ops::create_file(&registry, handle, &"/old.sav".into(), 8).unwrap();

    let result =
        archive_ops::rename_file(&registry, handle, &"/old.sav".into(), handle, &"/new.sav".into());
    assert_eq!(result, Ok(()));

    let old = archive_ops::open_file(&registry, handle, &"/old.sav".into(), OpenMode::read_only());
    assert!(matches!(old, Err(ERR_FILE_NOT_FOUND)));
    let new = archive_ops::open_file(&registry, handle, &"/new.sav".into(), OpenMode::read_only());
    assert!(new.is_ok());
}

#[test]
fn test_rename_across_archives_unimplemented() {
    let registry = memory_registry();
    let sdmc = open(&registry, ArchiveIdCode::Sdmc);
    let save = open(&registry, ArchiveIdCode::SaveData);
    archive_ops::create_file(&registry, sdmc, &"/a".into(), 0).unwrap();

    let result = archive_ops::rename_file(&registry, sdmc, &"/a".into(), save, &"/a".into());
    assert_eq!(result, Err(unimplemented_function(ErrorModule::Fs)));
    assert!(archive_ops::open_file(&registry, sdmc, &"/a".into(), OpenMode::read_only()).is_ok());
    assert!(archive_ops::open_file(&registry, save, &"/a".into(), OpenMode::read_only()).is_err());

    // two opens of the same kind are still distinct archives
    let sdmc_again = open(&registry, ArchiveIdCode::Sdmc);
    let result =
        archive_ops::rename_file(&registry, sdmc, &"/a".into(), sdmc_again, &"/b".into());
    assert_eq!(result, Err(unimplemented_function(ErrorModule::Fs)));
    assert!(archive_ops::open_file(&registry, sdmc, &"/a".into(), OpenMode::read_only()).is_ok());
}

#[test]
fn test_session_survives_archive_close() {
    let registry = memory_registry();
    let handle = open(&registry, ArchiveIdCode::Sdmc);
    let mut memory = FlatGuestMemory::with_region(BUFFER, 0x1000);
    let mut session = archive_ops::open_file(
        &registry,
        handle,
        &"/keep.bin".into(),
        OpenMode::read_write_create(),
    )
    .unwrap();

    registry.close_archive(handle).unwrap();
    assert_eq!(registry.close_archive(handle), Err(ERR_INVALID_HANDLE));

    assert_eq!(write(&mut session, &mut memory, 2, &[9, 8]), 2);
    assert_eq!(read(&mut session, &mut memory, 0, 16), vec![0, 0, 9, 8]);
}

#[test]
fn test_size_round_trip_large_values() {
    let registry = memory_registry();
    let handle = open(&registry, ArchiveIdCode::Sdmc);
    let mut memory = FlatGuestMemory::with_region(BUFFER, 0x1000);
    let mut session = archive_ops::open_file(
        &registry,
        handle,
        &"/sparse".into(),
        OpenMode::read_write_create(),
    )
    .unwrap();

    for size in [0u64, 0x1_0000_0000, 0x7_FFFF_FFFF] {
        let mut cmd = CommandBuffer::new();
        cmd.set_word(0, FileCommand::SetSize.header());
        cmd.write_u64(1, size);
        session
            .dispatch(&mut cmd, &mut memory, &mut NoSessionHandles)
            .unwrap();
        assert_eq!(cmd.status(), ResultCode::SUCCESS);

        let mut cmd = CommandBuffer::from_words(&[FileCommand::GetSize.header()]);
        session
            .dispatch(&mut cmd, &mut memory, &mut NoSessionHandles)
            .unwrap();
        assert_eq!(cmd.read_u64(2), size);
    }
}

#[test]
fn test_directory_listing_through_session() {
    let registry = memory_registry();
    let handle = open(&registry, ArchiveIdCode::Sdmc);
    archive_ops::create_directory(&registry, handle, &"/saves".into()).unwrap();
    for name in ["/saves/one", "/saves/two", "/saves/three"] {
        archive_ops::create_file(&registry, handle, &name.into(), 1).unwrap();
    }

    let mut memory = FlatGuestMemory::with_region(BUFFER, 0x4000);
    let mut session = archive_ops::open_directory(&registry, handle, &"/saves".into()).unwrap();

    let mut counts = Vec::new();
    for _ in 0..3 {
        let mut cmd = CommandBuffer::from_words(&[DirectoryCommand::Read.header(), 2, 0, BUFFER]);
        session.dispatch(&mut cmd, &mut memory).unwrap();
        assert_eq!(cmd.status(), ResultCode::SUCCESS);
        counts.push(cmd.word(2));
    }
    assert_eq!(counts, vec![2, 1, 0]);
}

#[test]
fn test_service_with_host_directories() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let service = FsService::start(FsConfig::rooted_at(dir.path()));
    let registry = service.registry();
    let handle = open(registry, ArchiveIdCode::Sdmc);
    let mut memory = FlatGuestMemory::with_region(BUFFER, 0x1000);

    archive_ops::create_directory(registry, handle, &"/photos".into()).unwrap();
    let mut session = archive_ops::open_file(
        registry,
        handle,
        &"/photos/cat.jpg".into(),
        OpenMode::read_write_create(),
    )
    .unwrap();
    assert_eq!(write(&mut session, &mut memory, 0, b"meow"), 4);
    drop(session);

    let on_disk = std::fs::read(dir.path().join("sdmc/photos/cat.jpg")).unwrap();
    assert_eq!(on_disk, b"meow");

    service.create_ext_save_data(MediaType::Sdmc, 0, 7).unwrap();
    service.delete_ext_save_data(MediaType::Sdmc, 0, 7).unwrap();
    service.create_system_save_data(1, 2).unwrap();
    service.delete_system_save_data(1, 2).unwrap();

    service.shutdown();
    assert_eq!(
        registry.open_archive(ArchiveIdCode::Sdmc, &ArchivePath::Empty),
        Err(fs_result::ERR_ARCHIVE_NOT_FOUND)
    );
}

#[test]
fn test_wide_path_reaches_same_file() {
    let registry = memory_registry();
    let handle = open(&registry, ArchiveIdCode::Sdmc);
    archive_ops::create_file(&registry, handle, &"/wide.txt".into(), 3).unwrap();

    let raw: Vec<u8> = "/wide.txt\0"
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    let path = ArchivePath::from_raw(4, &raw);
    let session = archive_ops::open_file(&registry, handle, &path, OpenMode::read_only());
    assert!(session.is_ok());
}
