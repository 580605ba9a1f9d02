//! Flash image loading from ZIP archives.
//!
//! An image is a plain ZIP file whose entries become files (and
//! directories) on a `MemFlash`, e.g. assets prepared on the host and
//! "flashed" before the drive is registered.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{FsError, FsResult};
use crate::flash::MemFlash;

/// Copy every entry of a ZIP archive into `flash`.
///
/// Directory entries are created, files are written with their full path.
/// Returns the number of files written.
pub fn load_image<R: Read + Seek>(reader: R, flash: &mut MemFlash) -> FsResult<usize> {
    let mut archive = ZipArchive::new(reader)?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if entry.is_dir() {
            flash
                .create_dir_all(&name)
                .map_err(|e| FsError::from_native(e, &name))?;
            continue;
        }

        // Declared sizes are untrusted; stop one byte past the free space.
        let limit = (flash.free_bytes() as u64).saturating_add(1);
        let mut content = Vec::new();
        (&mut entry).take(limit).read_to_end(&mut content)?;
        if content.len() as u64 == limit {
            return Err(FsError::Full { written: 0 });
        }
        flash
            .add_file(&name, content)
            .map_err(|e| FsError::from_native(e, &name))?;
        count += 1;
    }

    log::debug!("loaded {} files from flash image", count);
    Ok(count)
}

/// Load an image from a ZIP file on disk.
pub fn load_image_from_path(path: impl AsRef<Path>, flash: &mut MemFlash) -> FsResult<usize> {
    let file = File::open(path)?;
    load_image(file, flash)
}
