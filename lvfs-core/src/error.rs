//! Error types for the filesystem driver adapter.

use thiserror::Error;

use crate::flash::FlashError;

/// Outcome vocabulary of the generic file API.
///
/// Every adapter operation maps to exactly one of these. The numeric values
/// are stable and match the order the toolkit reports them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    Ok = 0,
    NotFound = 1,
    AccessDenied = 2,
    Full = 3,
    InvalidHandle = 4,
    Unknown = 5,
}

impl ResultCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::NotFound => "NOT_FOUND",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::Full => "FULL",
            Self::InvalidHandle => "INVALID_HANDLE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Errors returned by the driver registry and the adapters.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Storage full ({written} bytes written)")]
    Full { written: usize },

    #[error("Invalid or closed handle")]
    InvalidHandle,

    #[error("Invalid drive path: {0}")]
    InvalidDrive(String),

    #[error("Drive already registered: {0}")]
    DriveInUse(char),

    #[error("Seek to negative position: {0}")]
    InvalidSeek(i64),

    #[error("Buffer too small")]
    BufferTooSmall,

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Flash error: {0}")]
    Native(FlashError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FsError {
    /// Classify this error into the generic API's result vocabulary.
    pub fn code(&self) -> ResultCode {
        match self {
            Self::NotFound(_) => ResultCode::NotFound,
            Self::AccessDenied(_) | Self::DriveInUse(_) => ResultCode::AccessDenied,
            Self::Full { .. } => ResultCode::Full,
            Self::InvalidHandle | Self::InvalidDrive(_) => ResultCode::InvalidHandle,
            Self::InvalidSeek(_)
            | Self::BufferTooSmall
            | Self::LockPoisoned
            | Self::Native(_)
            | Self::Io(_)
            | Self::Zip(_)
            | Self::Json(_) => ResultCode::Unknown,
        }
    }

    /// Translate a native flash failure that happened while operating on `path`.
    pub fn from_native(err: FlashError, path: &str) -> Self {
        match err {
            FlashError::NoEntry => Self::NotFound(path.to_string()),
            FlashError::IsDir | FlashError::ReadOnly | FlashError::Exists => {
                Self::AccessDenied(path.to_string())
            }
            FlashError::NoSpace | FlashError::FileTooBig => Self::Full { written: 0 },
            FlashError::BadHandle => Self::InvalidHandle,
            other => {
                log::warn!("unmapped flash error on {:?}: {}", path, other);
                Self::Native(other)
            }
        }
    }
}

/// Result type for filesystem adapter operations.
pub type FsResult<T> = Result<T, FsError>;

/// Collapse an operation's outcome into its result code.
pub fn result_code<T>(res: &FsResult<T>) -> ResultCode {
    match res {
        Ok(_) => ResultCode::Ok,
        Err(e) => e.code(),
    }
}
