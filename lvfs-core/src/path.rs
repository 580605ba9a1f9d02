//! Drive-letter paths.
//!
//! A path is `<letter>:<native-path>`, e.g. `S:test_file.txt` or `S:` for the
//! root. Everything after the colon belongs to the driver.

use crate::error::{FsError, FsResult};

/// Number of drive letters (A-Z).
pub const DRIVE_COUNT: usize = 26;

/// A path split into its drive letter and native remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrivePath<'a> {
    /// Upper-case drive letter.
    pub letter: char,
    /// Remainder after the colon, unmodified.
    pub native: &'a str,
}

/// Split `path` into drive letter and native path.
///
/// # Examples
/// ```
/// use lvfs_core::path::parse_drive_path;
/// let p = parse_drive_path("S:test_file.txt").unwrap();
/// assert_eq!(p.letter, 'S');
/// assert_eq!(p.native, "test_file.txt");
/// assert_eq!(parse_drive_path("s:").unwrap().native, "");
/// assert!(parse_drive_path("test.txt").is_err());
/// ```
pub fn parse_drive_path(path: &str) -> FsResult<DrivePath<'_>> {
    let mut chars = path.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => Ok(DrivePath {
            letter: letter.to_ascii_uppercase(),
            native: &path[2..],
        }),
        _ => Err(FsError::InvalidDrive(path.to_string())),
    }
}

/// Convert drive letter to index (A=0, B=1, ..., Z=25).
pub fn drive_index(letter: char) -> FsResult<usize> {
    let upper = letter.to_ascii_uppercase();
    if upper.is_ascii_uppercase() {
        Ok((upper as u8 - b'A') as usize)
    } else {
        Err(FsError::InvalidDrive(letter.to_string()))
    }
}

/// Drive letter for an index produced by `drive_index`.
pub(crate) fn drive_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Extension of the last path component, without the dot.
///
/// ```
/// use lvfs_core::path::extension;
/// assert_eq!(extension("S:img/logo.png"), "png");
/// assert_eq!(extension("S:dir.d/file"), "");
/// ```
pub fn extension(path: &str) -> &str {
    let last = last_component(path);
    match last.rfind('.') {
        Some(pos) => &last[pos + 1..],
        None => "",
    }
}

/// Last component of a path (file or directory name).
///
/// ```
/// use lvfs_core::path::last_component;
/// assert_eq!(last_component("S:dir/file.txt"), "file.txt");
/// assert_eq!(last_component("S:dir/"), "");
/// assert_eq!(last_component("S:file"), "file");
/// ```
pub fn last_component(path: &str) -> &str {
    let start = path
        .rfind(|c| c == '/' || c == '\\' || c == ':')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    &path[start..]
}

/// Path with its last component removed; trailing separators are ignored.
///
/// ```
/// use lvfs_core::path::parent;
/// assert_eq!(parent("S:dir/sub/file.txt"), "S:dir/sub");
/// assert_eq!(parent("S:dir/sub/"), "S:dir");
/// assert_eq!(parent("S:file.txt"), "S:");
/// assert_eq!(parent("S:/file.txt"), "S:/");
/// ```
pub fn parent(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    let trimmed = if trimmed.ends_with(':') && trimmed.len() < path.len() {
        // "S:/" style root: keep the root separator.
        &path[..trimmed.len() + 1]
    } else {
        trimmed
    };
    match trimmed.rfind(['/', '\\']) {
        Some(0) => &trimmed[..1],
        Some(pos) if trimmed[..pos].ends_with(':') => &trimmed[..pos + 1],
        Some(pos) => &trimmed[..pos],
        None => match trimmed.find(':') {
            Some(pos) => &trimmed[..pos + 1],
            None => "",
        },
    }
}
