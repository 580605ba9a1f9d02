//! Driver adapter over a native flash filesystem.
//!
//! `FlashDriver` implements the generic `FsDriver` interface on top of any
//! `FlashFs`. Native file and directory handles live in per-driver handle
//! tables; callers only ever see `HandleId`s.

mod dir;
mod file;

pub use dir::write_entry_name;

use dir::OpenDir;
use file::OpenFile;

use crate::driver::{FsDriver, OpenMode, SeekOrigin};
use crate::error::{FsError, FsResult};
use crate::flash::FlashFs;
use crate::handle::{HandleId, HandleTable};

/// Adapter from the generic file API to a native flash filesystem.
pub struct FlashDriver<F: FlashFs> {
    fs: F,
    files: HandleTable<OpenFile<F::File>>,
    dirs: HandleTable<OpenDir<F::Dir>>,
}

impl<F: FlashFs> FlashDriver<F> {
    /// Wrap a filesystem without mounting it.
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            files: HandleTable::new(),
            dirs: HandleTable::new(),
        }
    }

    /// Mount the filesystem (if needed) and wrap it.
    ///
    /// A mount failure is returned as-is; there is no degraded mode.
    pub fn mount(mut fs: F) -> FsResult<Self> {
        if !fs.is_mounted() {
            fs.mount().map_err(FsError::Native)?;
        }
        log::debug!("flash filesystem mounted");
        Ok(Self::new(fs))
    }

    /// Get the underlying filesystem.
    pub fn flash(&self) -> &F {
        &self.fs
    }

    /// Get mutable reference to the underlying filesystem.
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    /// Number of files currently open.
    pub fn open_files(&self) -> usize {
        self.files.len()
    }

    /// Number of directory streams currently open.
    pub fn open_dirs(&self) -> usize {
        self.dirs.len()
    }

    /// Close every open handle, unmount and give the filesystem back.
    pub fn unmount(mut self) -> FsResult<F> {
        for file in self.files.drain() {
            self.fs
                .close(file.native)
                .map_err(|e| FsError::from_native(e, &file.path))?;
        }
        for dir in self.dirs.drain() {
            self.fs
                .close_dir(dir.native)
                .map_err(|e| FsError::from_native(e, &dir.path))?;
        }
        self.fs.unmount().map_err(FsError::Native)?;
        Ok(self.fs)
    }
}

impl<F: FlashFs> FsDriver for FlashDriver<F> {
    fn ready(&self) -> bool {
        self.fs.is_mounted()
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> FsResult<HandleId> {
        self.file_open(path, mode)
    }

    fn close(&mut self, file: HandleId) -> FsResult<()> {
        self.file_close(file)
    }

    fn read(&mut self, file: HandleId, buf: &mut [u8]) -> FsResult<usize> {
        self.file_read(file, buf)
    }

    fn write(&mut self, file: HandleId, data: &[u8]) -> FsResult<usize> {
        self.file_write(file, data)
    }

    fn seek(&mut self, file: HandleId, offset: i64, origin: SeekOrigin) -> FsResult<u64> {
        self.file_seek(file, offset, origin)
    }

    fn tell(&mut self, file: HandleId) -> FsResult<u64> {
        self.file_tell(file)
    }

    fn size(&mut self, file: HandleId) -> FsResult<u64> {
        self.file_size(file)
    }

    fn dir_open(&mut self, path: &str) -> FsResult<HandleId> {
        self.open_dir(path)
    }

    fn dir_read(&mut self, dir: HandleId) -> FsResult<Option<String>> {
        self.read_dir(dir)
    }

    fn dir_close(&mut self, dir: HandleId) -> FsResult<()> {
        self.close_dir(dir)
    }
}
