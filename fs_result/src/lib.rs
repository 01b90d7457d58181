//! # Filesystem Result Codes
//!
//! This crate defines the result model every part of the filesystem service
//! communicates through.
//!
//! ## Philosophy
//!
//! - **Values, not exceptions**: Every recoverable failure is a [`ResultCode`]
//! - **Guest-exact**: The packed representation is what the guest reads back
//! - **Open set**: Raw codes outside the known enumerations stay representable
//!
//! ## Layout
//!
//! | Bits  | Field       |
//! |-------|-------------|
//! | 0-9   | description |
//! | 10-17 | module      |
//! | 21-26 | summary     |
//! | 27-31 | level       |

pub mod codes;
pub mod kinds;

use std::fmt;

pub use codes::{
    unimplemented_function, ERR_ALREADY_EXISTS, ERR_ARCHIVE_NOT_FOUND, ERR_DIRECTORY_NOT_FOUND,
    ERR_FILE_NOT_FOUND, ERR_GENERIC, ERR_INVALID_GUEST_ADDRESS, ERR_INVALID_HANDLE,
    ERR_OPERATION_CANCELED, ERR_RENAME_FAILED, ERR_UNSUPPORTED_MEDIA,
};
pub use kinds::{ErrorDescription, ErrorLevel, ErrorModule, ErrorSummary};

const DESCRIPTION_SHIFT: u32 = 0;
const DESCRIPTION_BITS: u32 = 10;
const MODULE_SHIFT: u32 = 10;
const MODULE_BITS: u32 = 8;
const SUMMARY_SHIFT: u32 = 21;
const SUMMARY_BITS: u32 = 6;
const LEVEL_SHIFT: u32 = 27;
const LEVEL_BITS: u32 = 5;

const fn mask(bits: u32) -> u32 {
    !(!0u32 << bits)
}

const fn field(raw: u32, shift: u32, bits: u32) -> u32 {
    (raw >> shift) & mask(bits)
}

/// A packed guest result code
///
/// The success value is raw `0`; every other value describes a failure.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ResultCode {
    raw: u32,
}

/// Either a success payload or the failure code describing why there is none
pub type ResultVal<T> = Result<T, ResultCode>;

impl ResultCode {
    /// The distinguished success value
    pub const SUCCESS: ResultCode = ResultCode { raw: 0 };

    /// Packs a result code from its four fields
    pub const fn new(
        description: ErrorDescription,
        module: ErrorModule,
        summary: ErrorSummary,
        level: ErrorLevel,
    ) -> Self {
        Self::from_parts(description.raw(), module.raw(), summary.raw(), level.raw())
    }

    /// Packs a result code from raw field values, truncating each to its width
    pub const fn from_parts(description: u32, module: u32, summary: u32, level: u32) -> Self {
        let raw = ((description & mask(DESCRIPTION_BITS)) << DESCRIPTION_SHIFT)
            | ((module & mask(MODULE_BITS)) << MODULE_SHIFT)
            | ((summary & mask(SUMMARY_BITS)) << SUMMARY_SHIFT)
            | ((level & mask(LEVEL_BITS)) << LEVEL_SHIFT);
        Self { raw }
    }

    /// Wraps a raw 32-bit value as read from a command buffer
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn raw(&self) -> u32 {
        self.raw
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        self.raw == Self::SUCCESS.raw
    }

    #[inline]
    pub const fn is_error(&self) -> bool {
        !self.is_success()
    }

    #[inline]
    pub const fn description_raw(&self) -> u32 {
        field(self.raw, DESCRIPTION_SHIFT, DESCRIPTION_BITS)
    }

    #[inline]
    pub const fn module_raw(&self) -> u32 {
        field(self.raw, MODULE_SHIFT, MODULE_BITS)
    }

    #[inline]
    pub const fn summary_raw(&self) -> u32 {
        field(self.raw, SUMMARY_SHIFT, SUMMARY_BITS)
    }

    #[inline]
    pub const fn level_raw(&self) -> u32 {
        field(self.raw, LEVEL_SHIFT, LEVEL_BITS)
    }

    /// Decodes the description, if it is one of the known values
    pub fn description(&self) -> Option<ErrorDescription> {
        ErrorDescription::try_from(self.description_raw()).ok()
    }

    /// Decodes the module, if it is one of the known values
    pub fn module(&self) -> Option<ErrorModule> {
        ErrorModule::try_from(self.module_raw()).ok()
    }

    /// Decodes the summary, if it is one of the known values
    pub fn summary(&self) -> Option<ErrorSummary> {
        ErrorSummary::try_from(self.summary_raw()).ok()
    }

    /// Decodes the level, if it is one of the known values
    pub fn level(&self) -> Option<ErrorLevel> {
        ErrorLevel::try_from(self.level_raw()).ok()
    }

    /// Converts into a `ResultVal`, producing `success` when this is the success value
    #[inline]
    pub fn into_result<T>(self, success: T) -> ResultVal<T> {
        self.into_result_with(|| success)
    }

    #[inline]
    pub fn into_result_with<T>(self, with_success: impl FnOnce() -> T) -> ResultVal<T> {
        if self.is_success() {
            Ok(with_success())
        } else {
            Err(self)
        }
    }

    /// Collapses a `ResultVal<()>` back into a single code for a reply buffer
    pub fn from_result(result: ResultVal<()>) -> Self {
        match result {
            Ok(()) => Self::SUCCESS,
            Err(code) => code,
        }
    }
}

struct FieldName<T>(Option<T>, u32);

impl<T: fmt::Debug> fmt::Display for FieldName<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(known) => write!(f, "{:?}", known),
            None => write!(f, "{}", self.1),
        }
    }
}

impl fmt::Debug for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return write!(f, "ResultCode(Success)");
        }
        write!(
            f,
            "ResultCode({:#010x}: {}/{}/{}/{})",
            self.raw,
            FieldName(self.module(), self.module_raw()),
            FieldName(self.description(), self.description_raw()),
            FieldName(self.summary(), self.summary_raw()),
            FieldName(self.level(), self.level_raw()),
        )
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return write!(f, "success");
        }
        write!(
            f,
            "{} error {} ({}, {}) [{:#010x}]",
            FieldName(self.module(), self.module_raw()),
            FieldName(self.description(), self.description_raw()),
            FieldName(self.summary(), self.summary_raw()),
            FieldName(self.level(), self.level_raw()),
            self.raw
        )
    }
}

impl std::error::Error for ResultCode {}

impl From<ResultCode> for u32 {
    fn from(code: ResultCode) -> Self {
        code.raw
    }
}
