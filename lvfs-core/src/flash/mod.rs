//! Native flash filesystem interface and backends.
//!
//! This module describes the API shape of the on-device flash filesystem the
//! adapter drives:
//! - `FlashFs`: native mount/file/directory operations
//! - `MemFlash`: in-memory flash with a byte capacity
//! - `HostFlash`: a host directory standing in for the flash partition

mod flash_fs;
mod host_flash;
mod mem_flash;

pub use flash_fs::{
    normalize, DirEntry, EntryKind, FlashError, FlashFs, FlashResult, OpenFlags, FILE_MAX,
};
pub use host_flash::HostFlash;
pub use mem_flash::MemFlash;
