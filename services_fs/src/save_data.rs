//! Save-data containers on the host
//!
//! Extended save data and system save data live in per-title directories
//! under the NAND or SD card mount point. These operations create or delete
//! those directories directly; any host failure is reported as the generic
//! error code.

use crate::config::FsConfig;
use fs_backend::ArchivePath;
use fs_result::{raw_enum, ResultVal, ERR_GENERIC, ERR_UNSUPPORTED_MEDIA};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Identifier of the emulated console, as used in container paths
pub const SYSTEM_ID: &str = "00000000000000000000000000000000";

/// Identifier of the emulated SD card, as used in container paths
pub const SDCARD_ID: &str = "00000000000000000000000000000000";

raw_enum! {
    /// Storage device a save-data container is rooted on
    pub enum MediaType {
        Nand = 0,
        Sdmc = 1,
        GameCard = 2,
    }
}

fn binary_path(words: &[u32]) -> ArchivePath {
    ArchivePath::Binary(words.iter().flat_map(|w| w.to_le_bytes()).collect())
}

fn word_at(bytes: &[u8], index: usize) -> Option<u32> {
    let start = index * 4;
    let chunk = bytes.get(start..start + 4)?;
    Some(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

/// Binary path naming an extended save data
///
/// The guest lays it out as `{ media: u32, save_id: u64 }`, so the low word of
/// the id precedes the high word: `[media, low, high]`.
pub fn ext_save_data_binary_path(media: u32, high: u32, low: u32) -> ArchivePath {
    binary_path(&[media, low, high])
}

/// Binary path naming a system save data: `[high, low]`
pub fn system_save_data_binary_path(high: u32, low: u32) -> ArchivePath {
    binary_path(&[high, low])
}

/// Directory holding every extended save data on `mount_point`
///
/// Shared containers live in NAND, the rest on the SD card.
pub fn ext_data_container_path(mount_point: &Path, shared: bool) -> PathBuf {
    if shared {
        mount_point.join("data").join(SYSTEM_ID).join("extdata")
    } else {
        mount_point
            .join("Nintendo 3DS")
            .join(SYSTEM_ID)
            .join(SDCARD_ID)
            .join("extdata")
    }
}

/// Directory holding every system save data on `mount_point`
pub fn system_save_data_container_path(mount_point: &Path) -> PathBuf {
    mount_point.join("data").join(SYSTEM_ID).join("sysdata")
}

fn per_title_path(container: &Path, high: u32, low: u32) -> PathBuf {
    container
        .join(format!("{:08X}", high))
        .join(format!("{:08X}", low))
}

/// Directory of one extended save data, from its binary path
pub fn ext_save_data_path(container: &Path, path: &ArchivePath) -> Option<PathBuf> {
    let bytes = path.as_binary();
    let low = word_at(&bytes, 1)?;
    let high = word_at(&bytes, 2)?;
    Some(per_title_path(container, high, low))
}

/// Directory of one system save data, from its binary path
pub fn system_save_data_path(container: &Path, path: &ArchivePath) -> Option<PathBuf> {
    let bytes = path.as_binary();
    Some(per_title_path(
        container,
        word_at(&bytes, 0)?,
        word_at(&bytes, 1)?,
    ))
}

fn media_directory(config: &FsConfig, media: MediaType) -> ResultVal<&Path> {
    match media {
        MediaType::Nand => Ok(config.nand_directory.as_path()),
        MediaType::Sdmc => Ok(config.sdmc_directory.as_path()),
        MediaType::GameCard => {
            error!(?media, "unsupported media type for save data");
            Err(ERR_UNSUPPORTED_MEDIA)
        }
    }
}

fn ext_save_data_dir(
    config: &FsConfig,
    media: MediaType,
    high: u32,
    low: u32,
) -> ResultVal<PathBuf> {
    let mount_point = media_directory(config, media)?;
    let container = ext_data_container_path(mount_point, media == MediaType::Nand);
    let path = ext_save_data_binary_path(media.raw(), high, low);
    ext_save_data_path(&container, &path).ok_or(ERR_GENERIC)
}

fn system_save_data_dir(config: &FsConfig, high: u32, low: u32) -> ResultVal<PathBuf> {
    let container = system_save_data_container_path(&config.nand_directory);
    let path = system_save_data_binary_path(high, low);
    system_save_data_path(&container, &path).ok_or(ERR_GENERIC)
}

fn create_full_path(dir: &Path) -> ResultVal<()> {
    fs::create_dir_all(dir).map_err(|e| {
        warn!(path = %dir.display(), error = %e, "failed to create save data");
        ERR_GENERIC
    })?;
    debug!(path = %dir.display(), "created save data");
    Ok(())
}

fn delete_recursively(dir: &Path) -> ResultVal<()> {
    fs::remove_dir_all(dir).map_err(|e| {
        warn!(path = %dir.display(), error = %e, "failed to delete save data");
        ERR_GENERIC
    })?;
    debug!(path = %dir.display(), "deleted save data");
    Ok(())
}

/// Creates the container of an extended save data
pub fn create_ext_save_data(
    config: &FsConfig,
    media: MediaType,
    high: u32,
    low: u32,
) -> ResultVal<()> {
    create_full_path(&ext_save_data_dir(config, media, high, low)?)
}

/// Deletes an extended save data and everything in it
pub fn delete_ext_save_data(
    config: &FsConfig,
    media: MediaType,
    high: u32,
    low: u32,
) -> ResultVal<()> {
    delete_recursively(&ext_save_data_dir(config, media, high, low)?)
}

/// Creates the container of a system save data in NAND
pub fn create_system_save_data(config: &FsConfig, high: u32, low: u32) -> ResultVal<()> {
    create_full_path(&system_save_data_dir(config, high, low)?)
}

/// Deletes a system save data and everything in it
pub fn delete_system_save_data(config: &FsConfig, high: u32, low: u32) -> ResultVal<()> {
    delete_recursively(&system_save_data_dir(config, high, low)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_binary_paths() {
        assert_eq!(
            ext_save_data_binary_path(1, 0x0004_0000, 0x0000_1234).as_binary(),
            vec![1, 0, 0, 0, 0x34, 0x12, 0, 0, 0, 0, 4, 0]
        );
        assert_eq!(
            system_save_data_binary_path(0xAABB_CCDD, 2).as_binary(),
            vec![0xDD, 0xCC, 0xBB, 0xAA, 2, 0, 0, 0]
        );
    }

    #[test]
    fn test_ext_save_data_path_from_guest_save_id() {
        let save_id: u64 = 0x0000_00AA_0000_00BB;
        let mut guest = 1u32.to_le_bytes().to_vec();
        guest.extend_from_slice(&save_id.to_le_bytes());

        let built = ext_save_data_binary_path(1, (save_id >> 32) as u32, save_id as u32);
        assert_eq!(built.as_binary(), guest);
        assert_eq!(
            ext_save_data_path(Path::new("/c"), &ArchivePath::Binary(guest)),
            Some(PathBuf::from("/c/000000AA/000000BB"))
        );
    }

    #[test]
    fn test_container_paths() {
        let mount = Path::new("/mnt");
        assert_eq!(
            ext_data_container_path(mount, true),
            PathBuf::from(format!("/mnt/data/{}/extdata", SYSTEM_ID))
        );
        assert_eq!(
            ext_data_container_path(mount, false),
            PathBuf::from(format!("/mnt/Nintendo 3DS/{}/{}/extdata", SYSTEM_ID, SDCARD_ID))
        );
        assert_eq!(
            system_save_data_container_path(mount),
            PathBuf::from(format!("/mnt/data/{}/sysdata", SYSTEM_ID))
        );
        assert_eq!(SYSTEM_ID.len(), 32);
    }

    #[test]
    fn test_per_title_path_is_upper_hex() {
        let path = ext_save_data_binary_path(1, 0xAB, 0x1234_5678);
        assert_eq!(
            ext_save_data_path(Path::new("/c"), &path),
            Some(PathBuf::from("/c/000000AB/12345678"))
        );
        assert_eq!(
            system_save_data_path(Path::new("/c"), &ArchivePath::Binary(vec![1, 2])),
            None
        );
    }

    #[test]
    fn test_ext_save_data_lifecycle() {
        let dir = TempDir::new().unwrap();
        let config = FsConfig::rooted_at(dir.path());
        create_ext_save_data(&config, MediaType::Sdmc, 0, 0x42).unwrap();
        let expected = ext_data_container_path(&config.sdmc_directory, false)
            .join("00000000")
            .join("00000042");
        assert!(expected.is_dir());

        fs::write(expected.join("blob"), b"data").unwrap();
        delete_ext_save_data(&config, MediaType::Sdmc, 0, 0x42).unwrap();
        assert!(!expected.exists());
        assert_eq!(
            delete_ext_save_data(&config, MediaType::Sdmc, 0, 0x42),
            Err(ERR_GENERIC)
        );
    }

    #[test]
    fn test_shared_ext_save_data_in_nand() {
        let dir = TempDir::new().unwrap();
        let config = FsConfig::rooted_at(dir.path());
        create_ext_save_data(&config, MediaType::Nand, 0xF000_0001, 2).unwrap();
        assert!(ext_data_container_path(&config.nand_directory, true)
            .join("F0000001")
            .join("00000002")
            .is_dir());
    }

    #[test]
    fn test_unsupported_media() {
        let dir = TempDir::new().unwrap();
        let config = FsConfig::rooted_at(dir.path());
        assert_eq!(
            create_ext_save_data(&config, MediaType::GameCard, 0, 1),
            Err(ERR_GENERIC)
        );
        assert_eq!(
            delete_ext_save_data(&config, MediaType::GameCard, 0, 1),
            Err(ERR_UNSUPPORTED_MEDIA)
        );
        assert_eq!(MediaType::try_from(7), Err(7));
    }

    #[test]
    fn test_system_save_data_lifecycle() {
        let dir = TempDir::new().unwrap();
        let config = FsConfig::rooted_at(dir.path());
        create_system_save_data(&config, 0x0001_0000, 0x0002_0000).unwrap();
        let expected = system_save_data_container_path(&config.nand_directory)
            .join("00010000")
            .join("00020000");
        assert!(expected.is_dir());
        delete_system_save_data(&config, 0x0001_0000, 0x0002_0000).unwrap();
        assert!(!expected.exists());
    }

    #[test]
    fn test_host_failure_is_generic() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("nand");
        fs::write(&blocker, b"not a directory").unwrap();
        let config = FsConfig::rooted_at(dir.path());
        assert_eq!(create_system_save_data(&config, 1, 2), Err(ERR_GENERIC));
    }
}
