//! Archive-relative paths
//!
//! The guest names files with a typed "low path": empty, raw binary, ASCII or
//! UTF-16. Backends that store a hierarchy walk text paths component by
//! component.

use fs_result::raw_enum;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while interpreting a path
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// Path is malformed or tries to leave the archive root
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path carries binary data where text was required
    #[error("Path is not textual: {0}")]
    NotText(String),
}

raw_enum! {
    /// Discriminant the guest sends alongside path bytes
    pub enum LowPathType {
        Invalid = 0,
        Empty = 1,
        Binary = 2,
        Char = 3,
        Wchar = 4,
    }
}

/// A path into an archive, or the path that selects an archive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ArchivePath {
    Invalid,
    #[default]
    Empty,
    Binary(Vec<u8>),
    Char(String),
    Wchar(String),
}

impl ArchivePath {
    /// Builds a path from the (type, bytes) pair found in a request
    ///
    /// Text paths stop at the first NUL terminator.
    ///
    /// # Examples
    ///
    /// ```
    /// use fs_backend::ArchivePath;
    ///
    /// let path = ArchivePath::from_raw(3, b"/save.bin\0");
    /// assert_eq!(path, ArchivePath::Char("/save.bin".to_string()));
    /// ```
    pub fn from_raw(kind: u32, data: &[u8]) -> Self {
        match LowPathType::try_from(kind).unwrap_or(LowPathType::Invalid) {
            LowPathType::Invalid => ArchivePath::Invalid,
            LowPathType::Empty => ArchivePath::Empty,
            LowPathType::Binary => ArchivePath::Binary(data.to_vec()),
            LowPathType::Char => {
                let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
                ArchivePath::Char(String::from_utf8_lossy(&data[..end]).into_owned())
            }
            LowPathType::Wchar => {
                let units: Vec<u16> = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .take_while(|unit| *unit != 0)
                    .collect();
                ArchivePath::Wchar(String::from_utf16_lossy(&units))
            }
        }
    }

    pub fn kind(&self) -> LowPathType {
        match self {
            ArchivePath::Invalid => LowPathType::Invalid,
            ArchivePath::Empty => LowPathType::Empty,
            ArchivePath::Binary(_) => LowPathType::Binary,
            ArchivePath::Char(_) => LowPathType::Char,
            ArchivePath::Wchar(_) => LowPathType::Wchar,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, ArchivePath::Invalid)
    }

    /// Returns the textual form of the path, if it has one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArchivePath::Empty => Some(""),
            ArchivePath::Char(s) | ArchivePath::Wchar(s) => Some(s),
            ArchivePath::Invalid | ArchivePath::Binary(_) => None,
        }
    }

    /// Returns the path as bytes (UTF-16LE for wide paths)
    pub fn as_binary(&self) -> Vec<u8> {
        match self {
            ArchivePath::Invalid | ArchivePath::Empty => Vec::new(),
            ArchivePath::Binary(bytes) => bytes.clone(),
            ArchivePath::Char(s) => s.as_bytes().to_vec(),
            ArchivePath::Wchar(s) => s.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        }
    }

    /// Splits a textual path into its components
    ///
    /// Leading and trailing slashes are ignored, so `/` is the root and yields
    /// no components. Empty, `.` and `..` components are rejected.
    pub fn components(&self) -> Result<Vec<&str>, PathError> {
        let text = self
            .as_str()
            .ok_or_else(|| PathError::NotText(self.to_string()))?;
        let trimmed = text.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let components: Vec<&str> = trimmed.split('/').collect();
        for component in &components {
            if component.is_empty() {
                return Err(PathError::InvalidPath(
                    "Path contains empty component".to_string(),
                ));
            }
            if *component == "." || *component == ".." {
                return Err(PathError::InvalidPath(
                    "Relative path components (. or ..) are not supported".to_string(),
                ));
            }
            if component.contains('\0') {
                return Err(PathError::InvalidPath(
                    "Path contains NUL character".to_string(),
                ));
            }
        }
        Ok(components)
    }
}

impl From<&str> for ArchivePath {
    fn from(s: &str) -> Self {
        ArchivePath::Char(s.to_string())
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchivePath::Invalid => write!(f, "[invalid]"),
            ArchivePath::Empty => write!(f, "[empty]"),
            ArchivePath::Binary(bytes) => {
                write!(f, "[binary:")?;
                for byte in bytes {
                    write!(f, " {:02x}", byte)?;
                }
                write!(f, "]")
            }
            ArchivePath::Char(s) => write!(f, "{}", s),
            ArchivePath::Wchar(s) => write!(f, "{}", s),
        }
    }
}
