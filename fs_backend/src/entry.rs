//! Directory entries as the guest lays them out
//!
//! A directory read fills guest memory with fixed-size 0x228-byte records:
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0x000 | UTF-16 name, 0x106 units, NUL terminated |
//! | 0x20C | 8.3 short name, 9 bytes, NUL terminated |
//! | 0x215 | unknown (0x01) |
//! | 0x216 | 8.3 extension, 4 bytes, NUL terminated |
//! | 0x21A | unknown (0x01) |
//! | 0x21B | unknown (0x00) |
//! | 0x21C | is_directory |
//! | 0x21D | is_hidden |
//! | 0x21E | is_archive |
//! | 0x21F | is_read_only |
//! | 0x220 | file size, u64 little endian |

/// Size of one encoded entry in guest memory
pub const ENTRY_SIZE: usize = 0x228;

/// Number of UTF-16 code units in the long name field, terminator included
pub const FILENAME_LENGTH: usize = 0x106;

const SHORT_NAME_OFFSET: usize = 0x20C;
const SHORT_NAME_LENGTH: usize = 9;
const UNKNOWN1_OFFSET: usize = 0x215;
const EXTENSION_OFFSET: usize = 0x216;
const EXTENSION_LENGTH: usize = 4;
const UNKNOWN2_OFFSET: usize = 0x21A;
const UNKNOWN3_OFFSET: usize = 0x21B;
const IS_DIRECTORY_OFFSET: usize = 0x21C;
const IS_HIDDEN_OFFSET: usize = 0x21D;
const IS_ARCHIVE_OFFSET: usize = 0x21E;
const IS_READ_ONLY_OFFSET: usize = 0x21F;
const FILE_SIZE_OFFSET: usize = 0x220;

/// One entry produced by a directory read
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryEntry {
    pub name: String,
    /// 8.3 base name, upper case, at most 8 bytes
    pub short_name: String,
    /// 8.3 extension, upper case, at most 3 bytes
    pub extension: String,
    pub is_directory: bool,
    pub is_hidden: bool,
    pub is_archive: bool,
    pub is_read_only: bool,
    pub file_size: u64,
}

impl DirectoryEntry {
    /// Creates an entry for a regular file
    pub fn file(name: impl Into<String>, file_size: u64) -> Self {
        let name = name.into();
        let (short_name, extension) = short_name_for(&name, false);
        Self {
            name,
            short_name,
            extension,
            is_archive: true,
            file_size,
            ..Self::default()
        }
    }

    /// Creates an entry for a directory
    pub fn directory(name: impl Into<String>) -> Self {
        let name = name.into();
        let (short_name, extension) = short_name_for(&name, true);
        Self {
            name,
            short_name,
            extension,
            is_directory: true,
            ..Self::default()
        }
    }

    /// Writes this entry into `out` in guest layout
    ///
    /// `out` must hold at least [`ENTRY_SIZE`] bytes; only the first
    /// [`ENTRY_SIZE`] are touched.
    pub fn encode_into(&self, out: &mut [u8]) {
        let out = &mut out[..ENTRY_SIZE];
        out.fill(0);

        for (i, unit) in self
            .name
            .encode_utf16()
            .take(FILENAME_LENGTH - 1)
            .enumerate()
        {
            out[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }

        copy_ascii(
            &mut out[SHORT_NAME_OFFSET..SHORT_NAME_OFFSET + SHORT_NAME_LENGTH - 1],
            &self.short_name,
        );
        out[UNKNOWN1_OFFSET] = 0x01;
        copy_ascii(
            &mut out[EXTENSION_OFFSET..EXTENSION_OFFSET + EXTENSION_LENGTH - 1],
            &self.extension,
        );
        out[UNKNOWN2_OFFSET] = 0x01;
        out[UNKNOWN3_OFFSET] = 0x00;
        out[IS_DIRECTORY_OFFSET] = self.is_directory as u8;
        out[IS_HIDDEN_OFFSET] = self.is_hidden as u8;
        out[IS_ARCHIVE_OFFSET] = self.is_archive as u8;
        out[IS_READ_ONLY_OFFSET] = self.is_read_only as u8;
        out[FILE_SIZE_OFFSET..FILE_SIZE_OFFSET + 8].copy_from_slice(&self.file_size.to_le_bytes());
    }

    /// Encodes a run of entries back to back
    pub fn encode_all(entries: &[DirectoryEntry], out: &mut [u8]) {
        for (entry, chunk) in entries.iter().zip(out.chunks_exact_mut(ENTRY_SIZE)) {
            entry.encode_into(chunk);
        }
    }
}

fn copy_ascii(dest: &mut [u8], text: &str) {
    for (slot, byte) in dest.iter_mut().zip(text.bytes()) {
        *slot = byte;
    }
}

fn short_name_char(c: char) -> Option<char> {
    if c.is_ascii_alphanumeric() || "!#$%&'()-@^_`{}~".contains(c) {
        Some(c.to_ascii_uppercase())
    } else {
        None
    }
}

/// Derives the 8.3 name shown alongside the long name
///
/// Names whose base does not fit in eight characters become `XXXXXX~1`.
/// Directories get a blank-padded extension.
fn short_name_for(name: &str, is_directory: bool) -> (String, String) {
    let (base, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 && !is_directory => (&name[..dot], &name[dot + 1..]),
        _ => (name, ""),
    };

    let base: String = base.chars().filter_map(short_name_char).collect();
    let short_name = if base.len() > 8 {
        format!("{}~1", &base[..6])
    } else {
        base
    };

    let extension = if is_directory {
        "   ".to_string()
    } else {
        ext.chars().filter_map(short_name_char).take(3).collect()
    };
    (short_name, extension)
}
