//! In-memory flash filesystem.

use std::collections::BTreeMap;
use std::io::SeekFrom;

use super::flash_fs::{
    exceeds_file_max, normalize, DirEntry, EntryKind, FlashError, FlashFs, FlashResult,
    OpenFlags,
};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// Open file on a `MemFlash`.
#[derive(Debug)]
pub struct MemFile {
    path: String,
    pos: u64,
    read: bool,
    write: bool,
}

/// Open directory stream on a `MemFlash`. Entries are snapshotted at open.
#[derive(Debug)]
pub struct MemDir {
    entries: std::vec::IntoIter<DirEntry>,
}

/// Flash filesystem kept entirely in memory.
///
/// Behaves like littlefs as seen through its file API: a file cannot grow
/// once `capacity` bytes of file data are stored, writes past the end
/// zero-fill the gap, and a read-only mount rejects anything that mutates.
#[derive(Debug, Clone, Default)]
pub struct MemFlash {
    nodes: BTreeMap<String, Node>,
    capacity: Option<usize>,
    read_only: bool,
    mounted: bool,
}

/// Split a normalized path into (parent, name).
fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

impl MemFlash {
    /// Unlimited, writable, unmounted flash.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flash that holds at most `bytes` of file data.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            capacity: Some(bytes),
            ..Self::default()
        }
    }

    /// Mount read-only (takes effect immediately).
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Bytes of file data currently stored.
    pub fn used_bytes(&self) -> usize {
        self.nodes
            .values()
            .map(|n| match n {
                Node::File(data) => data.len(),
                Node::Dir => 0,
            })
            .sum()
    }

    pub fn free_bytes(&self) -> usize {
        self.capacity
            .map(|c| c.saturating_sub(self.used_bytes()))
            .unwrap_or(usize::MAX)
    }

    /// Check if a file or directory exists.
    pub fn exists(&self, path: &str) -> bool {
        match normalize(path) {
            Ok(p) => p.is_empty() || self.nodes.contains_key(&p),
            Err(_) => false,
        }
    }

    /// Read file content directly. Returns None if the file does not exist.
    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        let p = normalize(path).ok()?;
        match self.nodes.get(&p) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Create a directory and any missing parents (seeding helper).
    pub fn create_dir_all(&mut self, path: &str) -> FlashResult<()> {
        let p = normalize(path)?;
        let mut current = String::new();
        for part in p.split('/').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(part);
            match self.nodes.get(&current) {
                Some(Node::Dir) => {}
                Some(Node::File(_)) => return Err(FlashError::NotDir),
                None => {
                    self.nodes.insert(current.clone(), Node::Dir);
                }
            }
        }
        Ok(())
    }

    /// Store a whole file, creating parent directories (seeding helper).
    ///
    /// Works whether or not the flash is mounted or read-only, but still
    /// honours the capacity.
    pub fn add_file(&mut self, path: &str, data: impl Into<Vec<u8>>) -> FlashResult<()> {
        let p = normalize(path)?;
        if p.is_empty() {
            return Err(FlashError::IsDir);
        }
        let data = data.into();
        let existing = match self.nodes.get(&p) {
            Some(Node::Dir) => return Err(FlashError::IsDir),
            Some(Node::File(old)) => old.len(),
            None => 0,
        };
        if data.len() > self.free_bytes().saturating_add(existing) {
            return Err(FlashError::NoSpace);
        }
        let (parent, _) = split_parent(&p);
        self.create_dir_all(parent)?;
        self.nodes.insert(p, Node::File(data));
        Ok(())
    }

    /// Create a single directory.
    pub fn mkdir(&mut self, path: &str) -> FlashResult<()> {
        self.check_writable()?;
        let p = normalize(path)?;
        if p.is_empty() || self.nodes.contains_key(&p) {
            return Err(FlashError::Exists);
        }
        self.check_parent(&p)?;
        self.nodes.insert(p, Node::Dir);
        Ok(())
    }

    /// Remove a file or an empty directory.
    pub fn remove(&mut self, path: &str) -> FlashResult<()> {
        self.check_writable()?;
        let p = normalize(path)?;
        if p.is_empty() {
            return Err(FlashError::Invalid);
        }
        match self.nodes.get(&p) {
            None => return Err(FlashError::NoEntry),
            Some(Node::Dir) if self.children(&p).next().is_some() => {
                return Err(FlashError::NotEmpty)
            }
            Some(_) => {}
        }
        self.nodes.remove(&p);
        Ok(())
    }

    /// Rename a file or directory (with everything under it).
    pub fn rename(&mut self, from: &str, to: &str) -> FlashResult<()> {
        self.check_writable()?;
        let from = normalize(from)?;
        let to = normalize(to)?;
        if from.is_empty() || to.is_empty() {
            return Err(FlashError::Invalid);
        }
        if !self.nodes.contains_key(&from) {
            return Err(FlashError::NoEntry);
        }
        if self.nodes.contains_key(&to) {
            return Err(FlashError::Exists);
        }
        if to.starts_with(&format!("{}/", from)) {
            return Err(FlashError::Invalid);
        }
        self.check_parent(&to)?;

        let prefix = format!("{}/", from);
        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|k| **k == from || k.starts_with(&prefix))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = self.nodes.remove(&key) {
                let new_key = format!("{}{}", to, &key[from.len()..]);
                self.nodes.insert(new_key, node);
            }
        }
        Ok(())
    }

    fn check_mounted(&self) -> FlashResult<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(FlashError::NotMounted)
        }
    }

    fn check_writable(&self) -> FlashResult<()> {
        self.check_mounted()?;
        if self.read_only {
            Err(FlashError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn check_parent(&self, path: &str) -> FlashResult<()> {
        let (parent, _) = split_parent(path);
        if parent.is_empty() {
            return Ok(());
        }
        match self.nodes.get(parent) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(FlashError::NotDir),
            None => Err(FlashError::NoEntry),
        }
    }

    /// Direct children of a normalized directory path.
    fn children<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = (&'a String, &'a Node)> + 'a {
        self.nodes
            .iter()
            .filter(move |(k, _)| k.as_str() != dir && split_parent(k).0 == dir)
    }

    fn file_data(&self, path: &str) -> FlashResult<&Vec<u8>> {
        match self.nodes.get(path) {
            Some(Node::File(data)) => Ok(data),
            _ => Err(FlashError::BadHandle),
        }
    }

    fn file_data_mut(&mut self, path: &str) -> FlashResult<&mut Vec<u8>> {
        match self.nodes.get_mut(path) {
            Some(Node::File(data)) => Ok(data),
            _ => Err(FlashError::BadHandle),
        }
    }
}

impl FlashFs for MemFlash {
    type File = MemFile;
    type Dir = MemDir;

    fn mount(&mut self) -> FlashResult<()> {
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

    fn open(&mut self, path: &str, flags: OpenFlags) -> FlashResult<MemFile> {
        self.check_mounted()?;
        let p = normalize(path)?;
        if p.is_empty() {
            return Err(FlashError::IsDir);
        }
        if flags.mutates() && self.read_only {
            return Err(FlashError::ReadOnly);
        }

        match self.nodes.get_mut(&p) {
            Some(Node::Dir) => return Err(FlashError::IsDir),
            Some(Node::File(data)) => {
                if flags.truncate {
                    data.clear();
                }
            }
            None => {
                if !flags.create {
                    return Err(FlashError::NoEntry);
                }
                self.check_parent(&p)?;
                self.nodes.insert(p.clone(), Node::File(Vec::new()));
            }
        }

        Ok(MemFile {
            path: p,
            pos: 0,
            read: flags.read,
            write: flags.write,
        })
    }

    fn close(&mut self, _file: MemFile) -> FlashResult<()> {
        Ok(())
    }

    fn read(&mut self, file: &mut MemFile, buf: &mut [u8]) -> FlashResult<usize> {
        self.check_mounted()?;
        if !file.read {
            return Err(FlashError::BadHandle);
        }
        let data = self.file_data(&file.path)?;
        let pos = file.pos as usize;
        if pos >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - pos);
        buf[..n].copy_from_slice(&data[pos..pos + n]);
        file.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, file: &mut MemFile, data: &[u8]) -> FlashResult<usize> {
        self.check_mounted()?;
        if !file.write {
            return Err(FlashError::BadHandle);
        }
        if self.read_only {
            return Err(FlashError::ReadOnly);
        }
        if data.is_empty() {
            return Ok(0);
        }
        if exceeds_file_max(file.pos, data.len()) {
            return Err(FlashError::FileTooBig);
        }

        let free = self.free_bytes();
        let content = self.file_data_mut(&file.path)?;
        let pos = file.pos as usize;

        // Longest the file may become with the space left.
        let max_len = content.len().saturating_add(free);
        let end = pos.saturating_add(data.len()).min(max_len);
        if end <= pos {
            return Err(FlashError::NoSpace);
        }

        let n = end - pos;
        if end > content.len() {
            content
                .try_reserve(end - content.len())
                .map_err(|_| FlashError::NoSpace)?;
            content.resize(end, 0);
        }
        content[pos..end].copy_from_slice(&data[..n]);
        file.pos += n as u64;
        Ok(n)
    }

    fn seek(&mut self, file: &mut MemFile, pos: SeekFrom) -> FlashResult<u64> {
        self.check_mounted()?;
        let len = self.file_data(&file.path)?.len() as i64;
        let target = match pos {
            SeekFrom::Start(n) => i64::try_from(n).map_err(|_| FlashError::Invalid)?,
            SeekFrom::Current(d) => (file.pos as i64).checked_add(d).ok_or(FlashError::Invalid)?,
            SeekFrom::End(d) => len.checked_add(d).ok_or(FlashError::Invalid)?,
        };
        if target < 0 {
            return Err(FlashError::Invalid);
        }
        file.pos = target as u64;
        Ok(file.pos)
    }

    fn tell(&mut self, file: &mut MemFile) -> FlashResult<u64> {
        self.check_mounted()?;
        Ok(file.pos)
    }

    fn size(&mut self, file: &mut MemFile) -> FlashResult<u64> {
        self.check_mounted()?;
        Ok(self.file_data(&file.path)?.len() as u64)
    }

    fn open_dir(&mut self, path: &str) -> FlashResult<MemDir> {
        self.check_mounted()?;
        let p = normalize(path)?;
        if !p.is_empty() {
            match self.nodes.get(&p) {
                Some(Node::Dir) => {}
                Some(Node::File(_)) => return Err(FlashError::NotDir),
                None => return Err(FlashError::NoEntry),
            }
        }

        let entries: Vec<DirEntry> = self
            .children(&p)
            .map(|(key, node)| {
                let (_, name) = split_parent(key);
                DirEntry {
                    name: name.to_string(),
                    kind: match node {
                        Node::File(_) => EntryKind::File,
                        Node::Dir => EntryKind::Dir,
                    },
                }
            })
            .collect();

        Ok(MemDir {
            entries: entries.into_iter(),
        })
    }

    fn read_dir(&mut self, dir: &mut MemDir) -> FlashResult<Option<DirEntry>> {
        self.check_mounted()?;
        Ok(dir.entries.next())
    }

    fn close_dir(&mut self, _dir: MemDir) -> FlashResult<()> {
        Ok(())
    }
}
