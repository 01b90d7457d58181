//! Command buffers and opcode tables
//!
//! A request arrives as 64 little-endian words; word 0 is the command header.
//! The reply is written back into the same buffer, status first in word 1.

use fs_result::{raw_enum, ResultCode};

/// Number of words in a command buffer
pub const COMMAND_BUFFER_WORDS: usize = 64;

/// One request/reply buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuffer {
    words: [u32; COMMAND_BUFFER_WORDS],
}

impl CommandBuffer {
    /// Creates a zeroed buffer
    pub fn new() -> Self {
        Self {
            words: [0; COMMAND_BUFFER_WORDS],
        }
    }

    /// Creates a buffer whose leading words are `words`
    ///
    /// # Panics
    ///
    /// Panics if `words` holds more than [`COMMAND_BUFFER_WORDS`] entries.
    pub fn from_words(words: &[u32]) -> Self {
        let mut buffer = Self::new();
        buffer.words[..words.len()].copy_from_slice(words);
        buffer
    }

    pub fn header(&self) -> u32 {
        self.words[0]
    }

    pub fn word(&self, index: usize) -> u32 {
        self.words[index]
    }

    pub fn set_word(&mut self, index: usize, value: u32) {
        self.words[index] = value;
    }

    /// Reads a 64-bit value stored low word first
    pub fn read_u64(&self, index: usize) -> u64 {
        u64::from(self.words[index]) | (u64::from(self.words[index + 1]) << 32)
    }

    /// Writes a 64-bit value low word first
    pub fn write_u64(&mut self, index: usize, value: u64) {
        self.words[index] = value as u32;
        self.words[index + 1] = (value >> 32) as u32;
    }

    /// Writes the status word of the reply
    pub fn set_status(&mut self, code: ResultCode) {
        self.words[1] = code.raw();
    }

    pub fn status(&self) -> ResultCode {
        ResultCode::from_raw(self.words[1])
    }

    pub fn words(&self) -> &[u32; COMMAND_BUFFER_WORDS] {
        &self.words
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

raw_enum! {
    /// Commands accepted by an open file session
    pub enum FileCommand {
        Dummy1 = 0x000100C6,
        Control = 0x040100C4,
        OpenSubFile = 0x08010100,
        Read = 0x080200C2,
        Write = 0x08030102,
        GetSize = 0x08040000,
        SetSize = 0x08050080,
        GetAttributes = 0x08060000,
        SetAttributes = 0x08070040,
        Close = 0x08080000,
        Flush = 0x08090000,
        SetPriority = 0x080A0040,
        GetPriority = 0x080B0000,
        OpenLinkFile = 0x080C0000,
    }
}

impl FileCommand {
    /// Decodes a header word; `None` for headers outside the table
    pub fn from_header(header: u32) -> Option<Self> {
        Self::try_from(header).ok()
    }

    pub const fn header(self) -> u32 {
        self.raw()
    }
}

raw_enum! {
    /// Commands accepted by an open directory session
    pub enum DirectoryCommand {
        Dummy1 = 0x000100C6,
        Control = 0x040100C4,
        Read = 0x08010042,
        Close = 0x08020000,
    }
}

impl DirectoryCommand {
    pub fn from_header(header: u32) -> Option<Self> {
        Self::try_from(header).ok()
    }

    pub const fn header(self) -> u32 {
        self.raw()
    }
}
