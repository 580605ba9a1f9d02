//! Mount configuration.
//!
//! Describes which flash backends are mounted under which drive letters:
//!
//! ```json
//! {
//!   "drives": [
//!     { "letter": "S", "backend": { "kind": "memory", "capacity": 65536, "image": "assets.zip" } },
//!     { "letter": "H", "backend": { "kind": "host", "root": "./flash" }, "readOnly": true }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::adapter::FlashDriver;
use crate::error::{FsError, FsResult};
use crate::flash::{HostFlash, MemFlash};
use crate::image::load_image_from_path;
use crate::registry::DriveRegistry;

/// Backend behind one drive letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BackendConfig {
    /// In-memory flash, optionally seeded from a ZIP image.
    #[serde(rename_all = "camelCase")]
    Memory {
        #[serde(default)]
        capacity: Option<usize>,
        #[serde(default)]
        image: Option<PathBuf>,
    },
    /// Host directory acting as the flash partition.
    #[serde(rename_all = "camelCase")]
    Host {
        root: PathBuf,
        /// Create `root` if it does not exist.
        #[serde(default)]
        format_on_fail: bool,
    },
}

/// Drive configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveConfig {
    /// Drive letter (A-Z)
    pub letter: char,
    pub backend: BackendConfig,
    /// Mount read-only
    #[serde(default)]
    pub read_only: bool,
}

/// Mount configuration schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountConfig {
    #[serde(default)]
    pub drives: Vec<DriveConfig>,
}

impl MountConfig {
    pub fn from_json(text: &str) -> FsResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> FsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Mount every configured drive and register it.
    ///
    /// Stops at the first failure; a drive that fails to mount is fatal.
    pub fn mount_all(&self, registry: &DriveRegistry) -> FsResult<()> {
        for drive in &self.drives {
            mount_drive(drive, registry)?;
        }
        Ok(())
    }
}

/// Build, mount and register one drive.
pub fn mount_drive(config: &DriveConfig, registry: &DriveRegistry) -> FsResult<()> {
    let letter = config.letter.to_ascii_uppercase();
    if registry.is_registered(letter) {
        return Err(FsError::DriveInUse(letter));
    }

    match &config.backend {
        BackendConfig::Memory { capacity, image } => {
            let mut flash = match capacity {
                Some(bytes) => MemFlash::with_capacity(*bytes),
                None => MemFlash::new(),
            };
            if let Some(image) = image {
                let count = load_image_from_path(image, &mut flash)?;
                log::info!("{}: seeded {} files from {}", letter, count, image.display());
            }
            flash.set_read_only(config.read_only);
            registry.register(letter, FlashDriver::mount(flash)?)?;
        }
        BackendConfig::Host {
            root,
            format_on_fail,
        } => {
            let flash = HostFlash::new(root)
                .format_on_fail(*format_on_fail)
                .read_only(config.read_only);
            registry.register(letter, FlashDriver::mount(flash)?)?;
        }
    }

    log::info!("{}: mounted ({:?})", letter, config.backend);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::OpenMode;
    use crate::error::ResultCode;

    #[test]
    fn test_parse_config() {
        let cfg = MountConfig::from_json(
            r#"{
                "drives": [
                    { "letter": "S", "backend": { "kind": "memory", "capacity": 1024 } },
                    { "letter": "H", "backend": { "kind": "host", "root": "/tmp/x", "formatOnFail": true }, "readOnly": true }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.drives.len(), 2);
        assert_eq!(cfg.drives[0].letter, 'S');
        assert_eq!(
            cfg.drives[0].backend,
            BackendConfig::Memory {
                capacity: Some(1024),
                image: None
            }
        );
        assert!(!cfg.drives[0].read_only);
        assert!(cfg.drives[1].read_only);
        assert_eq!(
            cfg.drives[1].backend,
            BackendConfig::Host {
                root: PathBuf::from("/tmp/x"),
                format_on_fail: true
            }
        );
    }

    #[test]
    fn test_roundtrip_json() {
        let cfg = MountConfig {
            drives: vec![DriveConfig {
                letter: 'S',
                backend: BackendConfig::Memory {
                    capacity: None,
                    image: None,
                },
                read_only: false,
            }],
        };
        let text = cfg.to_json().unwrap();
        assert!(text.contains("\"kind\": \"memory\""));
        assert_eq!(MountConfig::from_json(&text).unwrap(), cfg);
    }

    #[test]
    fn test_bad_json() {
        let err = MountConfig::from_json("{ drives: ").unwrap_err();
        assert!(matches!(err, FsError::Json(_)));
    }

    #[test]
    fn test_mount_all() {
        let cfg = MountConfig {
            drives: vec![
                DriveConfig {
                    letter: 's',
                    backend: BackendConfig::Memory {
                        capacity: Some(64),
                        image: None,
                    },
                    read_only: false,
                },
                DriveConfig {
                    letter: 'R',
                    backend: BackendConfig::Memory {
                        capacity: None,
                        image: None,
                    },
                    read_only: true,
                },
            ],
        };
        let reg = DriveRegistry::new();
        cfg.mount_all(&reg).unwrap();

        assert_eq!(reg.letters(), vec!['R', 'S']);
        assert!(reg.open("S:f", OpenMode::Write).is_ok());
        assert_eq!(
            reg.open("R:f", OpenMode::Write).unwrap_err().code(),
            ResultCode::AccessDenied
        );

        // Mounting the same letters again fails.
        assert!(matches!(
            cfg.mount_all(&reg).unwrap_err(),
            FsError::DriveInUse('S')
        ));
    }

    #[test]
    fn test_mount_missing_host_root() {
        let dir = tempfile::tempdir().unwrap();
        let drive = DriveConfig {
            letter: 'H',
            backend: BackendConfig::Host {
                root: dir.path().join("missing"),
                format_on_fail: false,
            },
            read_only: false,
        };
        let reg = DriveRegistry::new();
        assert!(mount_drive(&drive, &reg).is_err());
        assert!(!reg.is_registered('H'));
    }
}
