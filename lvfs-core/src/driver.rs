//! FsDriver trait - capability interface a registered drive implements.

use crate::error::FsResult;
use crate::handle::HandleId;

/// How a file is opened through the generic API.
///
/// - `Read`: the file must exist; nothing is created or truncated
/// - `Write`: created if absent, truncated if present
/// - `ReadWrite`: created if absent, never truncated; append by seeking to `End`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

impl OpenMode {
    pub fn can_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Reference point of a seek offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Start,
    Current,
    End,
}

/// Operations the registry dispatches to a drive.
///
/// Paths are native paths (drive prefix already stripped). Handle ids are
/// only meaningful to the driver that issued them.
pub trait FsDriver: Send {
    /// Whether the backing filesystem is usable.
    fn ready(&self) -> bool;

    fn open(&mut self, path: &str, mode: OpenMode) -> FsResult<HandleId>;

    fn close(&mut self, file: HandleId) -> FsResult<()>;

    fn read(&mut self, file: HandleId, buf: &mut [u8]) -> FsResult<usize>;

    fn write(&mut self, file: HandleId, data: &[u8]) -> FsResult<usize>;

    /// Move the position; returns the new absolute offset.
    fn seek(&mut self, file: HandleId, offset: i64, origin: SeekOrigin) -> FsResult<u64>;

    fn tell(&mut self, file: HandleId) -> FsResult<u64>;

    fn size(&mut self, file: HandleId) -> FsResult<u64>;

    fn dir_open(&mut self, path: &str) -> FsResult<HandleId>;

    /// Next entry name (directories prefixed with `/`), or None at the end.
    fn dir_read(&mut self, dir: HandleId) -> FsResult<Option<String>>;

    fn dir_close(&mut self, dir: HandleId) -> FsResult<()>;
}
