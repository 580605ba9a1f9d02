//! File handle translation.

use std::io::SeekFrom;

use super::FlashDriver;
use crate::driver::{OpenMode, SeekOrigin};
use crate::error::{FsError, FsResult};
use crate::flash::{FlashError, FlashFs, OpenFlags};
use crate::handle::HandleId;

/// Native file owned by the handle table.
pub(super) struct OpenFile<N> {
    pub(super) native: N,
    pub(super) path: String,
    pub(super) mode: OpenMode,
}

fn open_flags(mode: OpenMode) -> OpenFlags {
    match mode {
        OpenMode::Read => OpenFlags::READ,
        OpenMode::Write => OpenFlags::WRITE,
        OpenMode::ReadWrite => OpenFlags::READ_WRITE,
    }
}

impl<F: FlashFs> FlashDriver<F> {
    pub(super) fn file_open(&mut self, path: &str, mode: OpenMode) -> FsResult<HandleId> {
        // A file standing in for a parent directory means the path is missing.
        let native = self.fs.open(path, open_flags(mode)).map_err(|e| match e {
            FlashError::NotDir => FsError::NotFound(path.to_string()),
            other => FsError::from_native(other, path),
        })?;
        let id = self.files.insert(OpenFile {
            native,
            path: path.to_string(),
            mode,
        });
        log::debug!("open {:?} {:?} -> file #{}", path, mode, id.index());
        Ok(id)
    }

    pub(super) fn file_close(&mut self, id: HandleId) -> FsResult<()> {
        let file = self.files.remove(id).ok_or(FsError::InvalidHandle)?;
        log::debug!("close file #{} ({:?})", id.index(), file.path);
        self.fs
            .close(file.native)
            .map_err(|e| FsError::from_native(e, &file.path))
    }

    pub(super) fn file_read(&mut self, id: HandleId, buf: &mut [u8]) -> FsResult<usize> {
        let file = self.files.get_mut(id).ok_or(FsError::InvalidHandle)?;
        if !file.mode.can_read() {
            return Err(FsError::AccessDenied(file.path.clone()));
        }
        let n = self
            .fs
            .read(&mut file.native, buf)
            .map_err(|e| FsError::from_native(e, &file.path))?;
        log::trace!("read {}/{} bytes from {:?}", n, buf.len(), file.path);
        Ok(n)
    }

    pub(super) fn file_write(&mut self, id: HandleId, data: &[u8]) -> FsResult<usize> {
        let file = self.files.get_mut(id).ok_or(FsError::InvalidHandle)?;
        if !file.mode.can_write() {
            return Err(FsError::AccessDenied(file.path.clone()));
        }
        if data.is_empty() {
            return Ok(0);
        }
        match self.fs.write(&mut file.native, data) {
            Ok(n) if n < data.len() => {
                log::debug!("{:?} full after {} of {} bytes", file.path, n, data.len());
                Err(FsError::Full { written: n })
            }
            Ok(n) => {
                log::trace!("wrote {} bytes to {:?}", n, file.path);
                Ok(n)
            }
            Err(FlashError::NoSpace) => Err(FsError::Full { written: 0 }),
            Err(e) => Err(FsError::from_native(e, &file.path)),
        }
    }

    /// Positions below zero are rejected and leave the position unchanged;
    /// positions past the end are accepted.
    pub(super) fn file_seek(
        &mut self,
        id: HandleId,
        offset: i64,
        origin: SeekOrigin,
    ) -> FsResult<u64> {
        let file = self.files.get_mut(id).ok_or(FsError::InvalidHandle)?;
        let native = |e| FsError::from_native(e, &file.path);
        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => self.fs.tell(&mut file.native).map_err(native)?,
            SeekOrigin::End => self.fs.size(&mut file.native).map_err(native)?,
        };
        let target = i64::try_from(base)
            .ok()
            .and_then(|b| b.checked_add(offset))
            .ok_or(FsError::InvalidSeek(offset))?;
        if target < 0 {
            return Err(FsError::InvalidSeek(target));
        }
        let pos = self
            .fs
            .seek(&mut file.native, SeekFrom::Start(target as u64))
            .map_err(native)?;
        log::trace!("seek {:?} {} {:?} -> {}", file.path, offset, origin, pos);
        Ok(pos)
    }

    pub(super) fn file_tell(&mut self, id: HandleId) -> FsResult<u64> {
        let file = self.files.get_mut(id).ok_or(FsError::InvalidHandle)?;
        self.fs
            .tell(&mut file.native)
            .map_err(|e| FsError::from_native(e, &file.path))
    }

    pub(super) fn file_size(&mut self, id: HandleId) -> FsResult<u64> {
        let file = self.files.get_mut(id).ok_or(FsError::InvalidHandle)?;
        self.fs
            .size(&mut file.native)
            .map_err(|e| FsError::from_native(e, &file.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultCode;
    use crate::flash::{MemFlash, FILE_MAX};

    fn driver() -> FlashDriver<MemFlash> {
        FlashDriver::mount(MemFlash::new()).unwrap()
    }

    fn read_all(d: &mut FlashDriver<MemFlash>, id: HandleId) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let n = d.file_read(id, &mut buf).unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    #[test]
    fn test_open_read_missing() {
        let mut d = driver();
        let err = d.file_open("nope.txt", OpenMode::Read).unwrap_err();
        assert_eq!(err.code(), ResultCode::NotFound);
        assert_eq!(d.open_files(), 0);
    }

    #[test]
    fn test_open_below_file_not_found() {
        let mut d = driver();
        d.flash_mut().add_file("a.txt", b"x".to_vec()).unwrap();
        for mode in [OpenMode::Read, OpenMode::Write] {
            let err = d.file_open("a.txt/x", mode).unwrap_err();
            assert_eq!(err.code(), ResultCode::NotFound);
        }
        assert_eq!(d.open_files(), 0);
    }

    #[test]
    fn test_write_far_past_end_is_full() {
        let mut d = driver();
        let id = d.file_open("f", OpenMode::Write).unwrap();
        assert_eq!(d.file_seek(id, 1 << 62, SeekOrigin::Start).unwrap(), 1 << 62);
        assert!(matches!(
            d.file_write(id, b"x"),
            Err(FsError::Full { written: 0 })
        ));
        assert_eq!(d.file_tell(id).unwrap(), 1 << 62);
        assert_eq!(d.file_size(id).unwrap(), 0);

        // Right up to the limit is still refused when it would cross it.
        d.file_seek(id, FILE_MAX as i64, SeekOrigin::Start).unwrap();
        assert_eq!(
            d.file_write(id, b"x").unwrap_err().code(),
            ResultCode::Full
        );
        d.file_close(id).unwrap();
    }

    #[test]
    fn test_write_truncates_existing() {
        let mut d = driver();
        d.flash_mut().add_file("f", b"old content".to_vec()).unwrap();

        let id = d.file_open("f", OpenMode::Write).unwrap();
        d.file_write(id, b"new").unwrap();
        d.file_close(id).unwrap();
        assert_eq!(d.flash().read_file("f"), Some(b"new".to_vec()));
    }

    #[test]
    fn test_read_write_preserves_and_appends() {
        let mut d = driver();
        d.flash_mut().add_file("log", b"abc".to_vec()).unwrap();

        let id = d.file_open("log", OpenMode::ReadWrite).unwrap();
        assert_eq!(d.file_tell(id).unwrap(), 0);
        assert_eq!(read_all(&mut d, id), b"abc");
        d.file_seek(id, 0, SeekOrigin::End).unwrap();
        d.file_write(id, b"def").unwrap();
        d.file_close(id).unwrap();
        assert_eq!(d.flash().read_file("log"), Some(b"abcdef".to_vec()));
    }

    #[test]
    fn test_read_write_creates() {
        let mut d = driver();
        let id = d.file_open("fresh", OpenMode::ReadWrite).unwrap();
        assert_eq!(d.file_size(id).unwrap(), 0);
        assert!(d.flash().exists("fresh"));
    }

    #[test]
    fn test_mode_enforced() {
        let mut d = driver();
        d.flash_mut().add_file("f", b"data".to_vec()).unwrap();

        let r = d.file_open("f", OpenMode::Read).unwrap();
        assert_eq!(
            d.file_write(r, b"x").unwrap_err().code(),
            ResultCode::AccessDenied
        );

        let w = d.file_open("g", OpenMode::Write).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(
            d.file_read(w, &mut buf).unwrap_err().code(),
            ResultCode::AccessDenied
        );
    }

    #[test]
    fn test_open_directory_denied() {
        let mut d = driver();
        d.flash_mut().create_dir_all("dir").unwrap();
        let err = d.file_open("dir", OpenMode::Read).unwrap_err();
        assert_eq!(err.code(), ResultCode::AccessDenied);
    }

    #[test]
    fn test_read_only_mount_denied() {
        let mut flash = MemFlash::new();
        flash.add_file("f", b"x".to_vec()).unwrap();
        flash.set_read_only(true);
        let mut d = FlashDriver::mount(flash).unwrap();

        let err = d.file_open("f", OpenMode::Write).unwrap_err();
        assert_eq!(err.code(), ResultCode::AccessDenied);
        assert!(d.file_open("f", OpenMode::Read).is_ok());
    }

    #[test]
    fn test_partial_write_reports_full() {
        let mut d = FlashDriver::mount(MemFlash::with_capacity(10)).unwrap();
        let id = d.file_open("f", OpenMode::Write).unwrap();

        match d.file_write(id, b"0123456789abcdef") {
            Err(FsError::Full { written }) => assert_eq!(written, 10),
            other => panic!("expected Full, got {:?}", other),
        }
        assert_eq!(d.file_tell(id).unwrap(), 10);

        match d.file_write(id, b"x") {
            Err(FsError::Full { written }) => assert_eq!(written, 0),
            other => panic!("expected Full, got {:?}", other),
        }
    }

    #[test]
    fn test_seek_origins() {
        let mut d = driver();
        d.flash_mut().add_file("f", b"0123456789".to_vec()).unwrap();
        let id = d.file_open("f", OpenMode::Read).unwrap();

        assert_eq!(d.file_seek(id, 4, SeekOrigin::Start).unwrap(), 4);
        assert_eq!(d.file_seek(id, 2, SeekOrigin::Current).unwrap(), 6);
        assert_eq!(d.file_seek(id, -3, SeekOrigin::End).unwrap(), 7);

        let mut buf = [0u8; 8];
        assert_eq!(d.file_read(id, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"789");
    }

    #[test]
    fn test_negative_seek_rejected() {
        let mut d = driver();
        d.flash_mut().add_file("f", b"abc".to_vec()).unwrap();
        let id = d.file_open("f", OpenMode::Read).unwrap();
        d.file_seek(id, 2, SeekOrigin::Start).unwrap();

        let err = d.file_seek(id, -5, SeekOrigin::Current).unwrap_err();
        assert!(matches!(err, FsError::InvalidSeek(-3)));
        assert_eq!(d.file_tell(id).unwrap(), 2);
    }

    #[test]
    fn test_seek_past_end() {
        let mut d = driver();
        let id = d.file_open("f", OpenMode::ReadWrite).unwrap();
        d.file_write(id, b"ab").unwrap();
        assert_eq!(d.file_seek(id, 5, SeekOrigin::End).unwrap(), 7);

        let mut buf = [0u8; 4];
        assert_eq!(d.file_read(id, &mut buf).unwrap(), 0);

        d.file_write(id, b"z").unwrap();
        assert_eq!(d.file_size(id).unwrap(), 8);
        assert_eq!(
            d.flash().read_file("f"),
            Some(vec![b'a', b'b', 0, 0, 0, 0, 0, b'z'])
        );
    }

    #[test]
    fn test_double_close() {
        let mut d = driver();
        let id = d.file_open("f", OpenMode::Write).unwrap();
        assert!(d.file_close(id).is_ok());
        assert_eq!(
            d.file_close(id).unwrap_err().code(),
            ResultCode::InvalidHandle
        );
        assert_eq!(
            d.file_tell(id).unwrap_err().code(),
            ResultCode::InvalidHandle
        );
    }

    #[test]
    fn test_reopen_is_independent() {
        let mut d = driver();
        d.flash_mut().add_file("f", b"abcdef".to_vec()).unwrap();
        let a = d.file_open("f", OpenMode::Read).unwrap();
        let b = d.file_open("f", OpenMode::Read).unwrap();
        assert_ne!(a, b);

        d.file_seek(a, 3, SeekOrigin::Start).unwrap();
        assert_eq!(d.file_tell(b).unwrap(), 0);
    }
}
