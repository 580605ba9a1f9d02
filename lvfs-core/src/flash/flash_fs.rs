//! FlashFs trait - native API of an embedded flash filesystem.

use std::io::SeekFrom;

use thiserror::Error;

/// Native failure vocabulary, modelled on littlefs error codes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlashError {
    #[error("no such file or directory")]
    NoEntry,

    #[error("entry already exists")]
    Exists,

    #[error("entry is a directory")]
    IsDir,

    #[error("entry is not a directory")]
    NotDir,

    #[error("directory not empty")]
    NotEmpty,

    #[error("no space left on device")]
    NoSpace,

    #[error("file too large")]
    FileTooBig,

    #[error("read-only filesystem")]
    ReadOnly,

    #[error("bad file handle")]
    BadHandle,

    #[error("invalid parameter")]
    Invalid,

    #[error("name too long")]
    NameTooLong,

    #[error("corrupted filesystem")]
    Corrupt,

    #[error("filesystem not mounted")]
    NotMounted,

    #[error("I/O error: {0}")]
    Io(String),
}

/// Largest file a flash filesystem holds (littlefs `LFS_FILE_MAX`).
pub const FILE_MAX: u64 = i32::MAX as u64;

/// Whether writing `len` bytes at `pos` would grow a file past `FILE_MAX`.
pub(crate) fn exceeds_file_max(pos: u64, len: usize) -> bool {
    pos.saturating_add(len as u64) > FILE_MAX
}

/// Result type for native flash operations.
pub type FlashResult<T> = Result<T, FlashError>;

/// Native open flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub truncate: bool,
}

impl OpenFlags {
    /// Open an existing file for reading.
    pub const READ: Self = Self {
        read: true,
        write: false,
        create: false,
        truncate: false,
    };

    /// Open for writing, creating or truncating.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        create: true,
        truncate: true,
    };

    /// Open for reading and writing, creating but never truncating.
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        create: true,
        truncate: false,
    };

    /// Whether these flags would modify the filesystem.
    pub fn mutates(&self) -> bool {
        self.write || self.create || self.truncate
    }
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry yielded by a native directory stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Native API of a flash filesystem.
///
/// Handles are owned values: `close`/`close_dir` consume them, so a native
/// handle can never be released twice.
pub trait FlashFs: Send {
    /// Native open file.
    type File: Send;
    /// Native open directory stream.
    type Dir: Send;

    fn mount(&mut self) -> FlashResult<()>;

    fn unmount(&mut self) -> FlashResult<()>;

    fn is_mounted(&self) -> bool;

    fn open(&mut self, path: &str, flags: OpenFlags) -> FlashResult<Self::File>;

    fn close(&mut self, file: Self::File) -> FlashResult<()>;

    /// Read into `buf`, returning 0 at end of file.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> FlashResult<usize>;

    /// Write `data` at the current position.
    ///
    /// A count shorter than `data.len()` means the storage filled up part-way;
    /// `NoSpace` means nothing was written.
    fn write(&mut self, file: &mut Self::File, data: &[u8]) -> FlashResult<usize>;

    /// Reposition the file, returning the new absolute offset.
    fn seek(&mut self, file: &mut Self::File, pos: SeekFrom) -> FlashResult<u64>;

    fn tell(&mut self, file: &mut Self::File) -> FlashResult<u64>;

    /// Current length of the file.
    fn size(&mut self, file: &mut Self::File) -> FlashResult<u64>;

    fn open_dir(&mut self, path: &str) -> FlashResult<Self::Dir>;

    /// Next entry of the stream, or `None` once exhausted.
    fn read_dir(&mut self, dir: &mut Self::Dir) -> FlashResult<Option<DirEntry>>;

    fn close_dir(&mut self, dir: Self::Dir) -> FlashResult<()>;
}

/// Normalize a native path into `/`-separated components without a leading
/// slash. The root directory normalizes to an empty string.
///
/// - Empty components and `.` are dropped
/// - `..` pops the previous component
/// - Escaping above the root is `Invalid`
///
/// # Examples
/// ```
/// use lvfs_core::flash::normalize;
/// assert_eq!(normalize("/test_file.txt").unwrap(), "test_file.txt");
/// assert_eq!(normalize("a//b/./c").unwrap(), "a/b/c");
/// assert_eq!(normalize("a/../b").unwrap(), "b");
/// assert_eq!(normalize("").unwrap(), "");
/// ```
pub fn normalize(path: &str) -> FlashResult<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(FlashError::Invalid);
                }
            }
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}
