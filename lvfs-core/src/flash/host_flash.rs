//! Host-directory flash filesystem.

use std::fs::{self, File, OpenOptions, ReadDir};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::flash_fs::{
    exceeds_file_max, normalize, DirEntry, EntryKind, FlashError, FlashFs, FlashResult,
    OpenFlags,
};

/// Flash partition backed by a directory on the host.
///
/// Native paths are confined to `root`; a path that climbs above it is
/// rejected with `Invalid`.
#[derive(Debug)]
pub struct HostFlash {
    root: PathBuf,
    read_only: bool,
    format_on_fail: bool,
    mounted: bool,
}

/// Open file on a `HostFlash`.
#[derive(Debug)]
pub struct HostFile {
    file: File,
}

/// Open directory stream on a `HostFlash`.
#[derive(Debug)]
pub struct HostDir {
    entries: ReadDir,
}

/// Map a host I/O error onto the flash error vocabulary.
pub(crate) fn flash_error(err: &io::Error) -> FlashError {
    match err.kind() {
        io::ErrorKind::NotFound => FlashError::NoEntry,
        io::ErrorKind::AlreadyExists => FlashError::Exists,
        io::ErrorKind::NotADirectory => FlashError::NotDir,
        io::ErrorKind::IsADirectory => FlashError::IsDir,
        io::ErrorKind::DirectoryNotEmpty => FlashError::NotEmpty,
        io::ErrorKind::StorageFull => FlashError::NoSpace,
        io::ErrorKind::FileTooLarge => FlashError::FileTooBig,
        io::ErrorKind::ReadOnlyFilesystem | io::ErrorKind::PermissionDenied => {
            FlashError::ReadOnly
        }
        io::ErrorKind::InvalidFilename => FlashError::NameTooLong,
        io::ErrorKind::InvalidInput => FlashError::Invalid,
        _ => FlashError::Io(err.to_string()),
    }
}

impl HostFlash {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: false,
            format_on_fail: false,
            mounted: false,
        }
    }

    /// Create the root directory at mount time if it is missing.
    pub fn format_on_fail(mut self, enabled: bool) -> Self {
        self.format_on_fail = enabled;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_mounted(&self) -> FlashResult<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(FlashError::NotMounted)
        }
    }

    /// Resolve a native path to a host path under `root`.
    fn host_path(&self, path: &str) -> FlashResult<PathBuf> {
        let rel = normalize(path)?;
        let mut full = self.root.clone();
        for part in rel.split('/').filter(|s| !s.is_empty()) {
            full.push(part);
        }
        Ok(full)
    }
}

impl FlashFs for HostFlash {
    type File = HostFile;
    type Dir = HostDir;

    fn mount(&mut self) -> FlashResult<()> {
        match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(FlashError::NotDir),
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.format_on_fail => {
                fs::create_dir_all(&self.root).map_err(|e| flash_error(&e))?;
            }
            Err(e) => return Err(flash_error(&e)),
        }
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) -> FlashResult<()> {
        self.check_mounted()?;
        self.mounted = false;
        Ok(())
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn open(&mut self, path: &str, flags: OpenFlags) -> FlashResult<HostFile> {
        self.check_mounted()?;
        if flags.mutates() && self.read_only {
            return Err(FlashError::ReadOnly);
        }
        let full = self.host_path(path)?;
        // Opening a directory for reading succeeds on some hosts.
        if full.is_dir() {
            return Err(FlashError::IsDir);
        }
        let file = OpenOptions::new()
            .read(flags.read)
            .write(flags.write)
            .create(flags.create)
            .truncate(flags.truncate)
            .open(&full)
            .map_err(|e| flash_error(&e))?;
        Ok(HostFile { file })
    }

    fn close(&mut self, file: HostFile) -> FlashResult<()> {
        if self.read_only {
            return Ok(());
        }
        file.file.sync_all().map_err(|e| flash_error(&e))
    }

    fn read(&mut self, file: &mut HostFile, buf: &mut [u8]) -> FlashResult<usize> {
        self.check_mounted()?;
        let mut total = 0;
        while total < buf.len() {
            match file.file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(flash_error(&e)),
            }
        }
        Ok(total)
    }

    fn write(&mut self, file: &mut HostFile, data: &[u8]) -> FlashResult<usize> {
        self.check_mounted()?;
        let pos = file.file.stream_position().map_err(|e| flash_error(&e))?;
        if exceeds_file_max(pos, data.len()) {
            return Err(FlashError::FileTooBig);
        }
        let mut total = 0;
        while total < data.len() {
            match file.file.write(&data[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if total > 0 => {
                    log::debug!("host write stopped after {} bytes: {}", total, e);
                    break;
                }
                Err(e) => return Err(flash_error(&e)),
            }
        }
        if total == 0 && !data.is_empty() {
            return Err(FlashError::NoSpace);
        }
        Ok(total)
    }

    fn seek(&mut self, file: &mut HostFile, pos: SeekFrom) -> FlashResult<u64> {
        self.check_mounted()?;
        file.file.seek(pos).map_err(|e| flash_error(&e))
    }

    fn tell(&mut self, file: &mut HostFile) -> FlashResult<u64> {
        self.check_mounted()?;
        file.file.stream_position().map_err(|e| flash_error(&e))
    }

    fn size(&mut self, file: &mut HostFile) -> FlashResult<u64> {
        self.check_mounted()?;
        file.file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| flash_error(&e))
    }

    fn open_dir(&mut self, path: &str) -> FlashResult<HostDir> {
        self.check_mounted()?;
        let full = self.host_path(path)?;
        let meta = fs::metadata(&full).map_err(|e| flash_error(&e))?;
        if !meta.is_dir() {
            return Err(FlashError::NotDir);
        }
        let entries = fs::read_dir(&full).map_err(|e| flash_error(&e))?;
        Ok(HostDir { entries })
    }

    fn read_dir(&mut self, dir: &mut HostDir) -> FlashResult<Option<DirEntry>> {
        self.check_mounted()?;
        let Some(entry) = dir.entries.next() else {
            return Ok(None);
        };
        let entry = entry.map_err(|e| flash_error(&e))?;
        let meta = entry.metadata().map_err(|e| flash_error(&e))?;
        let kind = if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        Ok(Some(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
        }))
    }

    fn close_dir(&mut self, _dir: HostDir) -> FlashResult<()> {
        Ok(())
    }
}
