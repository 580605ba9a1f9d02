//! Directory cursor translation.

use super::FlashDriver;
use crate::error::{FsError, FsResult};
use crate::flash::{FlashError, FlashFs};
use crate::handle::HandleId;

/// Native directory stream owned by the handle table.
pub(super) struct OpenDir<N> {
    pub(super) native: N,
    pub(super) path: String,
    /// Set once the native stream reported its end.
    finished: bool,
}

impl<F: FlashFs> FlashDriver<F> {
    pub(super) fn open_dir(&mut self, path: &str) -> FsResult<HandleId> {
        let native = self.fs.open_dir(path).map_err(|e| match e {
            FlashError::NotDir => FsError::NotFound(path.to_string()),
            other => FsError::from_native(other, path),
        })?;
        let id = self.dirs.insert(OpenDir {
            native,
            path: path.to_string(),
            finished: false,
        });
        log::debug!("opendir {:?} -> dir #{}", path, id.index());
        Ok(id)
    }

    /// Once the end is reached every further read reports the end again.
    pub(super) fn read_dir(&mut self, id: HandleId) -> FsResult<Option<String>> {
        let dir = self.dirs.get_mut(id).ok_or(FsError::InvalidHandle)?;
        if dir.finished {
            return Ok(None);
        }
        loop {
            let entry = self
                .fs
                .read_dir(&mut dir.native)
                .map_err(|e| FsError::from_native(e, &dir.path))?;
            let Some(entry) = entry else {
                dir.finished = true;
                return Ok(None);
            };
            if entry.name == "." || entry.name == ".." {
                continue;
            }
            return Ok(Some(if entry.is_dir() {
                format!("/{}", entry.name)
            } else {
                entry.name
            }));
        }
    }

    pub(super) fn close_dir(&mut self, id: HandleId) -> FsResult<()> {
        let dir = self.dirs.remove(id).ok_or(FsError::InvalidHandle)?;
        log::debug!("closedir #{} ({:?})", id.index(), dir.path);
        self.fs
            .close_dir(dir.native)
            .map_err(|e| FsError::from_native(e, &dir.path))
    }
}

/// Copy an entry name into a caller buffer and NUL-terminate it.
///
/// `None` (end of stream) writes an empty name. Names that do not fit are
/// cut at the last character boundary that leaves room for the terminator.
/// Returns the number of name bytes written.
pub fn write_entry_name(name: Option<&str>, buf: &mut [u8]) -> FsResult<usize> {
    let Some(max) = buf.len().checked_sub(1) else {
        return Err(FsError::BufferTooSmall);
    };
    let name = name.unwrap_or("");
    let mut n = name.len().min(max);
    while !name.is_char_boundary(n) {
        n -= 1;
    }
    buf[..n].copy_from_slice(&name.as_bytes()[..n]);
    buf[n] = 0;
    Ok(n)
}
