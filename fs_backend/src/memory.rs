//! In-memory archive
//!
//! A complete archive kept in host memory, for simulations and tests. Every
//! archive opened from one factory sees the same tree, but each open returns
//! a distinct backend instance. Open files hold their data independently of
//! the tree, so a file deleted or renamed while open stays readable.

use crate::{
    ArchiveBackend, ArchiveFactory, ArchivePath, DirectoryBackend, DirectoryEntry, FileBackend,
    OpenMode,
};
use fs_result::{ResultVal, ERR_ALREADY_EXISTS, ERR_FILE_NOT_FOUND};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Largest offset a write may reach; sizes beyond it stay logical only
pub const MAX_MATERIALIZED_SIZE: u64 = 64 * 1024 * 1024;

#[derive(Debug, Default)]
struct FileData {
    /// Materialised prefix; bytes in `bytes.len()..size` read as zero
    bytes: Vec<u8>,
    size: u64,
}

type SharedFile = Arc<RwLock<FileData>>;

#[derive(Debug, Clone)]
enum Node {
    File(SharedFile),
    Directory,
}

/// Flat map from normalised path ("a/b/c") to node; the root is implicit
#[derive(Debug, Default)]
struct Tree {
    nodes: BTreeMap<String, Node>,
}

fn key_of(path: &ArchivePath) -> Option<String> {
    path.components().ok().map(|components| components.join("/"))
}

fn parent_of(key: &str) -> &str {
    key.rfind('/').map(|i| &key[..i]).unwrap_or("")
}

fn leaf_of(key: &str) -> &str {
    key.rfind('/').map(|i| &key[i + 1..]).unwrap_or(key)
}

impl Tree {
    fn is_directory(&self, key: &str) -> bool {
        key.is_empty() || matches!(self.nodes.get(key), Some(Node::Directory))
    }

    fn exists(&self, key: &str) -> bool {
        key.is_empty() || self.nodes.contains_key(key)
    }

    fn descendants<'a>(&'a self, key: &'a str) -> impl Iterator<Item = (&'a String, &'a Node)> {
        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{}/", key)
        };
        self.nodes
            .iter()
            .filter(move |(k, _)| k.starts_with(&prefix) && k.len() > prefix.len())
    }

    fn children(&self, key: &str) -> Vec<DirectoryEntry> {
        self.descendants(key)
            .filter(|(k, _)| parent_of(k) == key)
            .map(|(k, node)| match node {
                Node::Directory => DirectoryEntry::directory(leaf_of(k)),
                Node::File(data) => DirectoryEntry::file(leaf_of(k), data.read().size),
            })
            .collect()
    }

    /// Checks a rename/create target: must not exist, parent must be a directory
    fn can_create(&self, key: &str) -> bool {
        !key.is_empty() && !self.exists(key) && self.is_directory(parent_of(key))
    }
}

/// Factory for [`MemoryArchive`] instances sharing one tree
pub struct MemoryArchiveFactory {
    name: String,
    tree: Arc<Mutex<Tree>>,
}

impl MemoryArchiveFactory {
    /// Creates a factory over an empty tree
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tree: Arc::new(Mutex::new(Tree::default())),
        }
    }
}

impl ArchiveFactory for MemoryArchiveFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, path: &ArchivePath) -> ResultVal<Box<dyn ArchiveBackend>> {
        if !path.is_valid() {
            return Err(ERR_FILE_NOT_FOUND);
        }
        Ok(Box::new(MemoryArchive {
            name: self.name.clone(),
            tree: Arc::clone(&self.tree),
        }))
    }

    fn format(&self, _path: &ArchivePath) -> ResultVal<()> {
        self.tree.lock().nodes.clear();
        Ok(())
    }
}

/// One open in-memory archive
pub struct MemoryArchive {
    name: String,
    tree: Arc<Mutex<Tree>>,
}

impl ArchiveBackend for MemoryArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn open_file(&self, path: &ArchivePath, mode: OpenMode) -> Option<Box<dyn FileBackend>> {
        let key = key_of(path)?;
        let mut tree = self.tree.lock();
        let existing = tree.nodes.get(&key).cloned();
        let data = match existing {
            Some(Node::File(data)) => data,
            Some(Node::Directory) => return None,
            None if mode.contains(OpenMode::CREATE) && tree.can_create(&key) => {
                let data = SharedFile::default();
                tree.nodes.insert(key, Node::File(Arc::clone(&data)));
                data
            }
            None => return None,
        };
        Some(Box::new(MemoryFile {
            data,
            mode,
            closed: false,
        }))
    }

    fn open_directory(&self, path: &ArchivePath) -> Option<Box<dyn DirectoryBackend>> {
        let key = key_of(path)?;
        let tree = self.tree.lock();
        if !tree.is_directory(&key) {
            return None;
        }
        Some(Box::new(MemoryDirectory {
            entries: tree.children(&key),
            cursor: 0,
        }))
    }

    fn delete_file(&self, path: &ArchivePath) -> bool {
        let Some(key) = key_of(path) else {
            return false;
        };
        let mut tree = self.tree.lock();
        if !matches!(tree.nodes.get(&key), Some(Node::File(_))) {
            return false;
        }
        tree.nodes.remove(&key).is_some()
    }

    fn delete_directory(&self, path: &ArchivePath) -> bool {
        let Some(key) = key_of(path) else {
            return false;
        };
        let mut tree = self.tree.lock();
        if key.is_empty() || !tree.is_directory(&key) || tree.descendants(&key).next().is_some() {
            return false;
        }
        tree.nodes.remove(&key).is_some()
    }

    fn create_file(&self, path: &ArchivePath, size: u64) -> ResultVal<()> {
        let key = key_of(path).ok_or(ERR_FILE_NOT_FOUND)?;
        let mut tree = self.tree.lock();
        if tree.exists(&key) {
            return Err(ERR_ALREADY_EXISTS);
        }
        if !tree.can_create(&key) {
            return Err(ERR_FILE_NOT_FOUND);
        }
        let data = FileData {
            bytes: Vec::new(),
            size,
        };
        tree.nodes
            .insert(key, Node::File(Arc::new(RwLock::new(data))));
        Ok(())
    }

    fn create_directory(&self, path: &ArchivePath) -> bool {
        let Some(key) = key_of(path) else {
            return false;
        };
        let mut tree = self.tree.lock();
        if !tree.can_create(&key) {
            return false;
        }
        tree.nodes.insert(key, Node::Directory);
        true
    }

    fn rename_file(&self, src: &ArchivePath, dst: &ArchivePath) -> bool {
        let (Some(src), Some(dst)) = (key_of(src), key_of(dst)) else {
            return false;
        };
        let mut tree = self.tree.lock();
        if !matches!(tree.nodes.get(&src), Some(Node::File(_))) || !tree.can_create(&dst) {
            return false;
        }
        match tree.nodes.remove(&src) {
            Some(node) => {
                tree.nodes.insert(dst, node);
                true
            }
            None => false,
        }
    }

    fn rename_directory(&self, src: &ArchivePath, dst: &ArchivePath) -> bool {
        let (Some(src), Some(dst)) = (key_of(src), key_of(dst)) else {
            return false;
        };
        let mut tree = self.tree.lock();
        if src.is_empty()
            || !matches!(tree.nodes.get(&src), Some(Node::Directory))
            || !tree.can_create(&dst)
            || dst.starts_with(&format!("{}/", src))
        {
            return false;
        }

        let moved: Vec<String> = tree
            .descendants(&src)
            .map(|(k, _)| k.clone())
            .chain(std::iter::once(src.clone()))
            .collect();
        for old in moved {
            if let Some(node) = tree.nodes.remove(&old) {
                let new = format!("{}{}", dst, &old[src.len()..]);
                tree.nodes.insert(new, node);
            }
        }
        true
    }
}

struct MemoryFile {
    data: SharedFile,
    mode: OpenMode,
    closed: bool,
}

impl FileBackend for MemoryFile {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> usize {
        if self.closed {
            return 0;
        }
        let data = self.data.read();
        if offset >= data.size {
            return 0;
        }
        let count = (data.size - offset).min(buf.len() as u64) as usize;
        let out = &mut buf[..count];
        out.fill(0);
        let materialised = data.bytes.len() as u64;
        if offset < materialised {
            let start = offset as usize;
            let end = (start + count).min(data.bytes.len());
            out[..end - start].copy_from_slice(&data.bytes[start..end]);
        }
        count
    }

    fn write(&mut self, offset: u64, _flush: bool, buf: &[u8]) -> usize {
        if self.closed || !self.mode.can_write() {
            return 0;
        }
        let Some(end) = offset.checked_add(buf.len() as u64) else {
            return 0;
        };
        if end > MAX_MATERIALIZED_SIZE {
            return 0;
        }
        let mut data = self.data.write();
        let (start, end) = (offset as usize, end as usize);
        if data.bytes.len() < end {
            data.bytes.resize(end, 0);
        }
        data.bytes[start..end].copy_from_slice(buf);
        data.size = data.size.max(end as u64);
        buf.len()
    }

    fn size(&self) -> u64 {
        self.data.read().size
    }

    fn set_size(&mut self, size: u64) {
        if self.closed || !self.mode.can_write() {
            return;
        }
        let mut data = self.data.write();
        if (data.bytes.len() as u64) > size {
            data.bytes.truncate(size as usize);
        }
        data.size = size;
    }

    fn flush(&mut self) {}

    fn close(&mut self) {
        self.closed = true;
    }
}

struct MemoryDirectory {
    entries: Vec<DirectoryEntry>,
    cursor: usize,
}

impl DirectoryBackend for MemoryDirectory {
    fn read(&mut self, entries: &mut [DirectoryEntry]) -> usize {
        let remaining = &self.entries[self.cursor..];
        let count = remaining.len().min(entries.len());
        entries[..count].clone_from_slice(&remaining[..count]);
        self.cursor += count;
        count
    }

    fn close(&mut self) {
        self.cursor = self.entries.len();
    }
}
