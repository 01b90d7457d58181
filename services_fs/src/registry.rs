//! Archive registry
//!
//! Maps archive kinds to their factories and live handles to open archives.
//! Both maps and the handle counter sit behind a single lock, which is held
//! for the whole of any backend call made through [`ArchiveRegistry::with_archive`].

use fs_backend::{ArchiveBackend, ArchiveFactory, ArchivePath};
use fs_result::{raw_enum, ResultVal, ERR_ARCHIVE_NOT_FOUND, ERR_INVALID_HANDLE};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info, trace};

raw_enum! {
    /// Archive kinds the guest can open
    pub enum ArchiveIdCode {
        RomFs = 0x00000003,
        SaveData = 0x00000004,
        ExtSaveData = 0x00000006,
        SharedExtSaveData = 0x00000007,
        SystemSaveData = 0x00000008,
        Sdmc = 0x00000009,
        SdmcWriteOnly = 0x0000000A,
        SaveDataCheck = 0x2345678A,
    }
}

/// Identifier of one open archive; never 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveHandle(u64);

impl ArchiveHandle {
    /// Wraps a raw handle value received from the guest
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArchiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "archive:{}", self.0)
    }
}

/// Two archives resolved together for an operation spanning both
pub enum ArchivePair<'a> {
    /// Both handles name the same open archive
    Same(&'a dyn ArchiveBackend),
    Distinct(&'a dyn ArchiveBackend, &'a dyn ArchiveBackend),
}

struct RegistryState {
    factories: BTreeMap<ArchiveIdCode, Box<dyn ArchiveFactory>>,
    archives: HashMap<ArchiveHandle, Box<dyn ArchiveBackend>>,
    next_handle: u64,
}

impl RegistryState {
    /// Scans forward from the counter, skipping 0 and live handles
    fn allocate_handle(&mut self) -> ArchiveHandle {
        loop {
            let candidate = self.next_handle;
            self.next_handle = self.next_handle.wrapping_add(1);
            let handle = ArchiveHandle(candidate);
            if candidate != 0 && !self.archives.contains_key(&handle) {
                return handle;
            }
        }
    }
}

/// Registry of archive factories and open archives
pub struct ArchiveRegistry {
    state: Mutex<RegistryState>,
}

impl ArchiveRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                factories: BTreeMap::new(),
                archives: HashMap::new(),
                next_handle: 1,
            }),
        }
    }

    /// Registers the factory for `id_code`
    ///
    /// # Panics
    ///
    /// Panics if a factory is already registered for `id_code`. Registration
    /// happens once at start-up; a duplicate is a wiring bug.
    pub fn register_archive(&self, factory: Box<dyn ArchiveFactory>, id_code: ArchiveIdCode) {
        let mut state = self.state.lock();
        if state.factories.contains_key(&id_code) {
            panic!("archive {:?} registered twice", id_code);
        }
        debug!(?id_code, name = factory.name(), "registered archive");
        state.factories.insert(id_code, factory);
    }

    /// Opens an archive of kind `id_code` and returns a fresh handle to it
    pub fn open_archive(
        &self,
        id_code: ArchiveIdCode,
        path: &ArchivePath,
    ) -> ResultVal<ArchiveHandle> {
        let mut state = self.state.lock();
        let factory = state.factories.get(&id_code).ok_or(ERR_ARCHIVE_NOT_FOUND)?;
        let backend = factory.open(path)?;
        let handle = state.allocate_handle();
        trace!(?id_code, %handle, %path, "opened archive");
        state.archives.insert(handle, backend);
        Ok(handle)
    }

    /// Closes `handle`, dropping its archive
    pub fn close_archive(&self, handle: ArchiveHandle) -> ResultVal<()> {
        let removed = self.state.lock().archives.remove(&handle);
        match removed {
            Some(_) => {
                trace!(%handle, "closed archive");
                Ok(())
            }
            None => Err(ERR_INVALID_HANDLE),
        }
    }

    /// Runs `f` against the archive behind `handle`; `None` if it is not open
    pub fn with_archive<R>(
        &self,
        handle: ArchiveHandle,
        f: impl FnOnce(&dyn ArchiveBackend) -> R,
    ) -> Option<R> {
        let state = self.state.lock();
        state.archives.get(&handle).map(|backend| f(backend.as_ref()))
    }

    /// Runs `f` against two archives at once; `None` if either is not open
    pub fn with_archive_pair<R>(
        &self,
        first: ArchiveHandle,
        second: ArchiveHandle,
        f: impl FnOnce(ArchivePair<'_>) -> R,
    ) -> Option<R> {
        let state = self.state.lock();
        let a = state.archives.get(&first)?;
        let b = state.archives.get(&second)?;
        let pair = if first == second {
            ArchivePair::Same(a.as_ref())
        } else {
            ArchivePair::Distinct(a.as_ref(), b.as_ref())
        };
        Some(f(pair))
    }

    /// Runs `f` against the factory for `id_code`; `None` if none is registered
    pub fn with_factory<R>(
        &self,
        id_code: ArchiveIdCode,
        f: impl FnOnce(&dyn ArchiveFactory) -> R,
    ) -> Option<R> {
        let state = self.state.lock();
        state.factories.get(&id_code).map(|factory| f(factory.as_ref()))
    }

    pub fn is_registered(&self, id_code: ArchiveIdCode) -> bool {
        self.state.lock().factories.contains_key(&id_code)
    }

    pub fn open_archive_count(&self) -> usize {
        self.state.lock().archives.len()
    }

    /// Drops every open archive and every factory
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        info!(
            open_archives = state.archives.len(),
            factories = state.factories.len(),
            "archive registry shutting down"
        );
        state.archives.clear();
        state.factories.clear();
    }
}

impl Default for ArchiveRegistry {
    fn default() -> Self {
        Self::new()
    }
}
