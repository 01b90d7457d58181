//! File open modes

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// How a file is opened
    ///
    /// Writing and resizing need `WRITE`. `CREATE` only makes a missing file
    /// appear; it grants no access by itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpenMode: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        /// Create the file if it does not exist
        const CREATE = 1 << 2;
    }
}

impl OpenMode {
    pub const fn read_only() -> Self {
        Self::READ
    }

    pub const fn read_write() -> Self {
        Self::READ.union(Self::WRITE)
    }

    /// Read, write and create-if-missing
    pub const fn read_write_create() -> Self {
        Self::all()
    }

    #[inline]
    pub const fn can_write(&self) -> bool {
        self.contains(Self::WRITE)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |bit: OpenMode, c: char| if self.contains(bit) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(Self::READ, 'r'),
            flag(Self::WRITE, 'w'),
            flag(Self::CREATE, 'c')
        )
    }
}
