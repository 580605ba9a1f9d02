//! Drive-letter Filesystem Driver Core
//!
//! This crate lets a generic, drive-letter addressed file API (`S:file.txt`)
//! run on top of an embedded flash filesystem:
//! - Drive registry that binds letters to drivers and dispatches calls
//! - File and directory adapters translating onto the native flash API
//! - Flash backends (in-memory and host directory) plus ZIP image seeding
//!
//! # Architecture
//!
//! The adapter uses a layered design:
//! - `FlashFs` trait: native flash filesystem (littlefs-style API)
//! - `FlashDriver`: adapter from `FlashFs` to the generic operations
//! - `FsDriver` trait: capability interface the registry dispatches to
//! - `DriveRegistry`: owned table of drive letters, handed to callers
//!
//! ```
//! use lvfs_core::{DriveRegistry, FlashDriver, MemFlash, OpenMode};
//!
//! let registry = DriveRegistry::new();
//! registry.register('S', FlashDriver::mount(MemFlash::new())?)?;
//!
//! let f = registry.open("S:hello.txt", OpenMode::Write)?;
//! registry.write(f, b"hello")?;
//! registry.close(f)?;
//!
//! let f = registry.open("S:hello.txt", OpenMode::Read)?;
//! assert_eq!(registry.read_to_end(f)?, b"hello");
//! registry.close(f)?;
//! # Ok::<(), lvfs_core::FsError>(())
//! ```

pub mod adapter;
pub mod config;
pub mod driver;
pub mod error;
pub mod flash;
pub mod handle;
pub mod image;
pub mod path;
pub mod registry;

pub use adapter::FlashDriver;
pub use config::{BackendConfig, DriveConfig, MountConfig};
pub use driver::{FsDriver, OpenMode, SeekOrigin};
pub use error::{result_code, FsError, FsResult, ResultCode};
pub use flash::{FlashError, FlashFs, HostFlash, MemFlash};
pub use handle::HandleId;
pub use image::{load_image, load_image_from_path};
pub use path::{parse_drive_path, DrivePath};
pub use registry::{DirCursor, DriveRegistry, FileHandle};
