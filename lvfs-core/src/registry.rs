//! Drive registry - binds drive letters to drivers and dispatches calls.
//!
//! A registry is built once at startup and handed to whatever performs file
//! operations. Clone is cheap (just clones the Arc); clones share the table.
//!
//! Registration is write-once per letter. Lookups take a read lock on the
//! table, and each driver is serialized by its own mutex, so operations on
//! different drives never contend on one another.

use std::sync::{Arc, Mutex, RwLock};

use crate::adapter::write_entry_name;
use crate::driver::{FsDriver, OpenMode, SeekOrigin};
use crate::error::{FsError, FsResult};
use crate::handle::HandleId;
use crate::path::{drive_index, drive_letter, parse_drive_path, DrivePath, DRIVE_COUNT};

/// Open file on a registered drive.
///
/// A plain token: copying it does not duplicate the stream, and once closed
/// every copy is rejected with `InvalidHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle {
    drive: char,
    id: HandleId,
}

impl FileHandle {
    /// Drive letter the file was opened on.
    pub fn drive(&self) -> char {
        self.drive
    }
}

/// Open directory stream on a registered drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirCursor {
    drive: char,
    id: HandleId,
}

impl DirCursor {
    pub fn drive(&self) -> char {
        self.drive
    }
}

type SharedDriver = Arc<Mutex<Box<dyn FsDriver>>>;

/// Registry state (interior of Arc<RwLock<...>>).
#[derive(Default)]
struct RegistryInner {
    /// Drivers (A=0, B=1, ..., Z=25)
    drives: [Option<SharedDriver>; DRIVE_COUNT],
}

/// Table of drive letters and their drivers.
#[derive(Clone, Default)]
pub struct DriveRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl DriveRegistry {
    /// Create a registry with no drives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a driver to a drive letter for the lifetime of the registry.
    pub fn register(&self, letter: char, driver: impl FsDriver + 'static) -> FsResult<()> {
        self.register_boxed(letter, Box::new(driver))
    }

    /// Bind an already boxed driver.
    pub fn register_boxed(&self, letter: char, driver: Box<dyn FsDriver>) -> FsResult<()> {
        let idx = drive_index(letter)?;
        let mut inner = self.inner.write().map_err(|_| FsError::LockPoisoned)?;
        if inner.drives[idx].is_some() {
            return Err(FsError::DriveInUse(drive_letter(idx)));
        }
        inner.drives[idx] = Some(Arc::new(Mutex::new(driver)));
        log::debug!("registered drive {}:", drive_letter(idx));
        Ok(())
    }

    /// Split a path and check that its drive is registered.
    pub fn resolve<'p>(&self, path: &'p str) -> FsResult<DrivePath<'p>> {
        let parsed = parse_drive_path(path)?;
        if self.is_registered(parsed.letter) {
            Ok(parsed)
        } else {
            Err(FsError::InvalidDrive(path.to_string()))
        }
    }

    /// Check if a drive letter is registered.
    pub fn is_registered(&self, letter: char) -> bool {
        self.driver(letter).is_ok()
    }

    /// Registered drive letters in alphabetical order.
    pub fn letters(&self) -> Vec<char> {
        let inner = match self.inner.read() {
            Ok(inner) => inner,
            Err(_) => return vec![],
        };
        inner
            .drives
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.as_ref().map(|_| drive_letter(i)))
            .collect()
    }

    /// Whether the drive is registered and its backend is usable.
    pub fn is_ready(&self, letter: char) -> bool {
        self.with_driver(letter, |d| Ok(d.ready())).unwrap_or(false)
    }

    /// Open a file.
    pub fn open(&self, path: &str, mode: OpenMode) -> FsResult<FileHandle> {
        let target = self.resolve(path)?;
        let id = self.with_driver(target.letter, |d| d.open(target.native, mode))?;
        Ok(FileHandle {
            drive: target.letter,
            id,
        })
    }

    /// Close a file. Closing the same handle twice fails with `InvalidHandle`.
    pub fn close(&self, file: FileHandle) -> FsResult<()> {
        self.with_handle_driver(file.drive, |d| d.close(file.id))
    }

    /// Read up to `buf.len()` bytes. Returns 0 at end of file.
    pub fn read(&self, file: FileHandle, buf: &mut [u8]) -> FsResult<usize> {
        self.with_handle_driver(file.drive, |d| d.read(file.id, buf))
    }

    /// Write bytes at the current position.
    ///
    /// Running out of storage fails with `Full { written }` carrying the
    /// number of bytes that did land.
    pub fn write(&self, file: FileHandle, data: &[u8]) -> FsResult<usize> {
        self.with_handle_driver(file.drive, |d| d.write(file.id, data))
    }

    /// Move the file position.
    pub fn seek(&self, file: FileHandle, offset: i64, origin: SeekOrigin) -> FsResult<()> {
        self.with_handle_driver(file.drive, |d| d.seek(file.id, offset, origin))
            .map(|_| ())
    }

    /// Current absolute position.
    pub fn tell(&self, file: FileHandle) -> FsResult<u64> {
        self.with_handle_driver(file.drive, |d| d.tell(file.id))
    }

    /// Current file length.
    pub fn size(&self, file: FileHandle) -> FsResult<u64> {
        self.with_handle_driver(file.drive, |d| d.size(file.id))
    }

    /// Read from the current position to end of file.
    pub fn read_to_end(&self, file: FileHandle) -> FsResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = self.read(file, &mut chunk)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..n]);
        }
    }

    /// Open a directory for enumeration.
    pub fn dir_open(&self, path: &str) -> FsResult<DirCursor> {
        let target = self.resolve(path)?;
        let id = self.with_driver(target.letter, |d| d.dir_open(target.native))?;
        Ok(DirCursor {
            drive: target.letter,
            id,
        })
    }

    /// Write the next entry name into `buf` (NUL-terminated, truncated to
    /// fit). An empty name marks the end of the directory and is repeated on
    /// every later call.
    pub fn dir_read(&self, dir: DirCursor, buf: &mut [u8]) -> FsResult<usize> {
        if buf.is_empty() {
            return Err(FsError::BufferTooSmall);
        }
        let name = self.dir_next(dir)?;
        write_entry_name(name.as_deref(), buf)
    }

    /// Next entry name, or None at the end of the directory.
    pub fn dir_next(&self, dir: DirCursor) -> FsResult<Option<String>> {
        self.with_handle_driver(dir.drive, |d| d.dir_read(dir.id))
    }

    /// Close a directory stream. Single-shot like `close`.
    pub fn dir_close(&self, dir: DirCursor) -> FsResult<()> {
        self.with_handle_driver(dir.drive, |d| d.dir_close(dir.id))
    }

    fn driver(&self, letter: char) -> FsResult<SharedDriver> {
        let idx = drive_index(letter)?;
        let inner = self.inner.read().map_err(|_| FsError::LockPoisoned)?;
        inner.drives[idx]
            .clone()
            .ok_or_else(|| FsError::InvalidDrive(format!("{}:", letter)))
    }

    fn with_driver<T>(
        &self,
        letter: char,
        f: impl FnOnce(&mut dyn FsDriver) -> FsResult<T>,
    ) -> FsResult<T> {
        let driver = self.driver(letter)?;
        let mut guard = driver.lock().map_err(|_| FsError::LockPoisoned)?;
        f(guard.as_mut())
    }

    /// Like `with_driver`, but an unknown drive means the handle is bogus.
    fn with_handle_driver<T>(
        &self,
        letter: char,
        f: impl FnOnce(&mut dyn FsDriver) -> FsResult<T>,
    ) -> FsResult<T> {
        match self.driver(letter) {
            Ok(driver) => {
                let mut guard = driver.lock().map_err(|_| FsError::LockPoisoned)?;
                f(guard.as_mut())
            }
            Err(FsError::InvalidDrive(_)) => Err(FsError::InvalidHandle),
            Err(e) => Err(e),
        }
    }
}
