//! # Guest Memory
//!
//! This crate defines how the filesystem service reaches guest memory.
//!
//! ## Philosophy
//!
//! - **Never compute host pointers**: Callers pass guest addresses through, the
//!   accessor decides what they mean
//! - **Bounds-checked views**: A resolved range is a sized slice, or an error
//! - **Permissions are explicit**: Reading from or writing to a region is checked
//!   against its permissions
//!
//! ## Key Types
//!
//! - [`GuestMemory`]: The accessor contract sessions depend on
//! - [`FlatGuestMemory`]: A set of non-overlapping host-backed regions

use bitflags::bitflags;
use fs_result::{ResultCode, ERR_INVALID_GUEST_ADDRESS};
use std::fmt;
use thiserror::Error;

/// Errors produced while resolving a guest address range
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuestMemoryError {
    #[error("Guest range {address:#010x}+{len:#x} is not mapped")]
    Unmapped { address: u32, len: usize },

    #[error("Guest range {address:#010x}+{len:#x} wraps the address space")]
    Overflow { address: u32, len: usize },

    #[error("Permission denied: attempted {access} at {address:#010x}")]
    PermissionDenied { address: u32, access: AccessKind },

    #[error("Region at {base:#010x} overlaps an existing mapping")]
    RegionOverlap { base: u32 },
}

impl From<GuestMemoryError> for ResultCode {
    fn from(_: GuestMemoryError) -> Self {
        ERR_INVALID_GUEST_ADDRESS
    }
}

/// Kind of access attempted on guest memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Read => write!(f, "read"),
            AccessKind::Write => write!(f, "write"),
        }
    }
}

/// Accessor turning a guest address range into host bytes
///
/// Implementations own the bounds checking; callers never index guest memory
/// themselves.
pub trait GuestMemory {
    /// Resolves `len` bytes at `address` for reading
    fn read_bytes(&self, address: u32, len: usize) -> Result<&[u8], GuestMemoryError>;

    /// Resolves `len` bytes at `address` for writing
    fn write_bytes(&mut self, address: u32, len: usize) -> Result<&mut [u8], GuestMemoryError>;
}

bitflags! {
    /// Access permissions for a guest region
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegionPerms: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

impl RegionPerms {
    pub const fn read_only() -> Self {
        Self::READ
    }

    pub const fn read_write() -> Self {
        Self::READ.union(Self::WRITE)
    }

    fn allows(&self, access: AccessKind) -> bool {
        match access {
            AccessKind::Read => self.contains(Self::READ),
            AccessKind::Write => self.contains(Self::WRITE),
        }
    }
}

#[derive(Debug)]
struct GuestRegion {
    base: u32,
    data: Vec<u8>,
    perms: RegionPerms,
}

impl GuestRegion {
    /// Exclusive end address, widened so a region may end at 4 GiB
    fn end(&self) -> u64 {
        self.base as u64 + self.data.len() as u64
    }

    fn contains(&self, start: u64, end: u64) -> bool {
        start >= self.base as u64 && end <= self.end()
    }
}

/// Guest memory made of host-allocated regions
///
/// Each region is a contiguous zero-initialised byte vector mapped at a guest
/// base address. A range resolves only if it lies entirely inside one region.
#[derive(Debug, Default)]
pub struct FlatGuestMemory {
    regions: Vec<GuestRegion>,
}

impl FlatGuestMemory {
    /// Creates an empty guest memory with no mapped regions
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    /// Creates guest memory with a single read-write region
    pub fn with_region(base: u32, size: usize) -> Self {
        let mut memory = Self::new();
        memory.regions.push(GuestRegion {
            base,
            data: vec![0; size],
            perms: RegionPerms::read_write(),
        });
        memory
    }

    /// Maps a new zero-filled region
    pub fn map(
        &mut self,
        base: u32,
        size: usize,
        perms: RegionPerms,
    ) -> Result<(), GuestMemoryError> {
        let start = base as u64;
        let end = start + size as u64;
        if end > u32::MAX as u64 + 1 {
            return Err(GuestMemoryError::Overflow {
                address: base,
                len: size,
            });
        }
        let overlaps = self
            .regions
            .iter()
            .any(|region| start < region.end() && (region.base as u64) < end);
        if overlaps {
            return Err(GuestMemoryError::RegionOverlap { base });
        }
        self.regions.push(GuestRegion {
            base,
            data: vec![0; size],
            perms,
        });
        Ok(())
    }

    /// Total number of mapped bytes
    pub fn mapped_bytes(&self) -> usize {
        self.regions.iter().map(|r| r.data.len()).sum()
    }

    fn locate(
        &self,
        address: u32,
        len: usize,
        access: AccessKind,
    ) -> Result<usize, GuestMemoryError> {
        let start = address as u64;
        let end = start
            .checked_add(len as u64)
            .filter(|end| *end <= u32::MAX as u64 + 1)
            .ok_or(GuestMemoryError::Overflow { address, len })?;

        let index = self
            .regions
            .iter()
            .position(|region| region.contains(start, end))
            .ok_or(GuestMemoryError::Unmapped { address, len })?;

        if !self.regions[index].perms.allows(access) {
            return Err(GuestMemoryError::PermissionDenied { address, access });
        }
        Ok(index)
    }
}

impl GuestMemory for FlatGuestMemory {
    fn read_bytes(&self, address: u32, len: usize) -> Result<&[u8], GuestMemoryError> {
        let index = self.locate(address, len, AccessKind::Read)?;
        let region = &self.regions[index];
        let offset = (address - region.base) as usize;
        Ok(&region.data[offset..offset + len])
    }

    fn write_bytes(&mut self, address: u32, len: usize) -> Result<&mut [u8], GuestMemoryError> {
        let index = self.locate(address, len, AccessKind::Write)?;
        let region = &mut self.regions[index];
        let offset = (address - region.base) as usize;
        Ok(&mut region.data[offset..offset + len])
    }
}
