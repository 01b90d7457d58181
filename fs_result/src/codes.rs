//! Named result codes used by the filesystem service
//!
//! Codes marked "not hardware-verified" are placeholders: they collapse several
//! distinct host conditions into one value and must not be relied on as a
//! stable contract.

use crate::{ErrorDescription, ErrorLevel, ErrorModule, ErrorSummary, ResultCode};

/// An archive or session handle is not present
pub const ERR_INVALID_HANDLE: ResultCode = ResultCode::new(
    ErrorDescription::InvalidHandle,
    ErrorModule::Fs,
    ErrorSummary::InvalidArgument,
    ErrorLevel::Permanent,
);

/// No factory is registered for the requested archive type
pub const ERR_ARCHIVE_NOT_FOUND: ResultCode = ResultCode::new(
    ErrorDescription::NotFound,
    ErrorModule::Fs,
    ErrorSummary::NotFound,
    ErrorLevel::Permanent,
);

/// The archive refused to open a file
pub const ERR_FILE_NOT_FOUND: ResultCode = ResultCode::new(
    ErrorDescription::FsNotFound,
    ErrorModule::Fs,
    ErrorSummary::NotFound,
    ErrorLevel::Status,
);

/// The archive refused to open a directory
pub const ERR_DIRECTORY_NOT_FOUND: ResultCode = ResultCode::new(
    ErrorDescription::NotFound,
    ErrorModule::Fs,
    ErrorSummary::NotFound,
    ErrorLevel::Permanent,
);

/// The path named by a create operation already exists
pub const ERR_ALREADY_EXISTS: ResultCode = ResultCode::new(
    ErrorDescription::AlreadyExists,
    ErrorModule::Fs,
    ErrorSummary::NothingHappened,
    ErrorLevel::Status,
);

/// Delete/create refused by the backend. Not hardware-verified.
pub const ERR_OPERATION_CANCELED: ResultCode = ResultCode::new(
    ErrorDescription::NoData,
    ErrorModule::Fs,
    ErrorSummary::Canceled,
    ErrorLevel::Status,
);

/// Same-archive rename refused by the backend. Not hardware-verified.
pub const ERR_RENAME_FAILED: ResultCode = ResultCode::new(
    ErrorDescription::NoData,
    ErrorModule::Fs,
    ErrorSummary::NothingHappened,
    ErrorLevel::Status,
);

/// Catch-all for host I/O failures in save-data container management.
/// Not hardware-verified.
pub const ERR_GENERIC: ResultCode = ResultCode::from_raw(u32::MAX);

/// Save-data container requested on a media type with no host directory
pub const ERR_UNSUPPORTED_MEDIA: ResultCode = ERR_GENERIC;

/// A guest address range could not be resolved to host memory
pub const ERR_INVALID_GUEST_ADDRESS: ResultCode = ResultCode::new(
    ErrorDescription::InvalidPointer,
    ErrorModule::Fs,
    ErrorSummary::InvalidArgument,
    ErrorLevel::Usage,
);

/// Builds the code reported for a recognised-but-unsupported or unknown command
pub const fn unimplemented_function(module: ErrorModule) -> ResultCode {
    ResultCode::new(
        ErrorDescription::NotImplemented,
        module,
        ErrorSummary::NotSupported,
        ErrorLevel::Permanent,
    )
}
