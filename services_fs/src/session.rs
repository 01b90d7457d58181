//! File and directory sessions
//!
//! A session owns the backend it was opened with and turns one command buffer
//! into one backend call per dispatch. Guest memory is reached only through
//! the [`GuestMemory`] accessor; an address range it refuses is reported in
//! the reply status and the backend is not called.

use crate::command::{CommandBuffer, DirectoryCommand, FileCommand};
use fs_backend::{ArchivePath, DirectoryBackend, DirectoryEntry, FileBackend, ENTRY_SIZE};
use fs_result::{
    unimplemented_function, ErrorModule, ResultCode, ResultVal, ERR_INVALID_GUEST_ADDRESS,
};
use guest_memory::GuestMemory;
use tracing::{error, trace, warn};

/// Transport-side hooks a session needs while dispatching
pub trait SessionHandles {
    /// Registers the session being dispatched under a new transport handle
    fn link_current_session(&mut self) -> ResultVal<u32>;
}

/// Transport that refuses every handle request
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSessionHandles;

impl SessionHandles for NoSessionHandles {
    fn link_current_session(&mut self) -> ResultVal<u32> {
        Err(unimplemented_function(ErrorModule::Kernel))
    }
}

/// Writes the unimplemented status for an unknown header and returns it
fn unknown_command(kind: &str, cmd: &mut CommandBuffer) -> ResultCode {
    let code = unimplemented_function(ErrorModule::Fs);
    error!("unknown {} command {:#010x}", kind, cmd.header());
    cmd.set_status(code);
    code
}

/// An open file
pub struct FileSession {
    backend: Box<dyn FileBackend>,
    path: ArchivePath,
    priority: u32,
    closed: bool,
}

impl FileSession {
    pub fn new(backend: Box<dyn FileBackend>, path: ArchivePath) -> Self {
        Self {
            backend,
            path,
            priority: 0,
            closed: false,
        }
    }

    pub fn path(&self) -> &ArchivePath {
        &self.path
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Executes the command in `cmd` and writes the reply into it
    ///
    /// Returns `Err` only for commands this session does not implement; every
    /// other outcome, including guest address failures, is reported in the
    /// reply status word.
    pub fn dispatch(
        &mut self,
        cmd: &mut CommandBuffer,
        memory: &mut dyn GuestMemory,
        handles: &mut dyn SessionHandles,
    ) -> ResultVal<()> {
        let command = match FileCommand::from_header(cmd.header()) {
            Some(command) => command,
            None => return Err(unknown_command("file", cmd)),
        };

        let status = match command {
            FileCommand::Read => self.read(cmd, memory),
            FileCommand::Write => self.write(cmd, memory),
            FileCommand::GetSize => {
                let size = self.backend.size();
                trace!(path = %self.path, size, "GetSize");
                cmd.write_u64(2, size);
                ResultCode::SUCCESS
            }
            FileCommand::SetSize => {
                let size = cmd.read_u64(1);
                trace!(path = %self.path, size, "SetSize");
                self.backend.set_size(size);
                ResultCode::SUCCESS
            }
            FileCommand::Close => {
                trace!(path = %self.path, "Close");
                self.close();
                ResultCode::SUCCESS
            }
            FileCommand::Flush => {
                trace!(path = %self.path, "Flush");
                self.backend.flush();
                ResultCode::SUCCESS
            }
            FileCommand::OpenLinkFile => {
                warn!(path = %self.path, "stubbed OpenLinkFile");
                let handle = handles.link_current_session().unwrap_or(0);
                cmd.set_word(3, handle);
                ResultCode::SUCCESS
            }
            FileCommand::SetPriority => {
                self.priority = cmd.word(1);
                trace!(priority = self.priority, "SetPriority");
                ResultCode::SUCCESS
            }
            FileCommand::GetPriority => {
                trace!("GetPriority");
                cmd.set_word(2, self.priority);
                ResultCode::SUCCESS
            }
            FileCommand::Dummy1
            | FileCommand::Control
            | FileCommand::OpenSubFile
            | FileCommand::GetAttributes
            | FileCommand::SetAttributes => return Err(unknown_command("file", cmd)),
        };

        cmd.set_status(status);
        Ok(())
    }

    fn read(&mut self, cmd: &mut CommandBuffer, memory: &mut dyn GuestMemory) -> ResultCode {
        let offset = cmd.read_u64(1);
        let length = cmd.word(3) as usize;
        let address = cmd.word(5);
        trace!(path = %self.path, offset, length, address, "Read");

        let count = if length == 0 {
            self.backend.read(offset, &mut [])
        } else {
            match memory.write_bytes(address, length) {
                Ok(dest) => self.backend.read(offset, dest),
                Err(e) => {
                    warn!(error = %e, "Read destination rejected");
                    return ResultCode::from(e);
                }
            }
        };
        cmd.set_word(2, count as u32);
        ResultCode::SUCCESS
    }

    fn write(&mut self, cmd: &mut CommandBuffer, memory: &mut dyn GuestMemory) -> ResultCode {
        let offset = cmd.read_u64(1);
        let length = cmd.word(3) as usize;
        let flush = cmd.word(4) != 0;
        let address = cmd.word(6);
        trace!(path = %self.path, offset, length, address, flush, "Write");

        let count = if length == 0 {
            self.backend.write(offset, flush, &[])
        } else {
            match memory.read_bytes(address, length) {
                Ok(src) => self.backend.write(offset, flush, src),
                Err(e) => {
                    warn!(error = %e, "Write source rejected");
                    return ResultCode::from(e);
                }
            }
        };
        cmd.set_word(2, count as u32);
        ResultCode::SUCCESS
    }

    /// Closes the backend; later closes are no-ops
    pub fn close(&mut self) {
        if !self.closed {
            self.backend.close();
            self.closed = true;
        }
    }
}

impl Drop for FileSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// An open directory
pub struct DirectorySession {
    backend: Box<dyn DirectoryBackend>,
    path: ArchivePath,
    closed: bool,
}

impl DirectorySession {
    pub fn new(backend: Box<dyn DirectoryBackend>, path: ArchivePath) -> Self {
        Self {
            backend,
            path,
            closed: false,
        }
    }

    pub fn path(&self) -> &ArchivePath {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Executes the command in `cmd` and writes the reply into it
    ///
    /// Unknown commands are reported in the reply only; the dispatch itself
    /// still succeeds.
    pub fn dispatch(
        &mut self,
        cmd: &mut CommandBuffer,
        memory: &mut dyn GuestMemory,
    ) -> ResultVal<()> {
        let status = match DirectoryCommand::from_header(cmd.header()) {
            Some(DirectoryCommand::Read) => self.read(cmd, memory),
            Some(DirectoryCommand::Close) => {
                trace!(path = %self.path, "Close");
                self.close();
                ResultCode::SUCCESS
            }
            Some(DirectoryCommand::Dummy1) | Some(DirectoryCommand::Control) | None => {
                unknown_command("directory", cmd);
                return Ok(());
            }
        };
        cmd.set_status(status);
        Ok(())
    }

    fn read(&mut self, cmd: &mut CommandBuffer, memory: &mut dyn GuestMemory) -> ResultCode {
        let count = cmd.word(1) as usize;
        let address = cmd.word(3);
        trace!(path = %self.path, count, address, "Read");

        let produced = if count == 0 {
            0
        } else {
            let Some(length) = count.checked_mul(ENTRY_SIZE) else {
                return ERR_INVALID_GUEST_ADDRESS;
            };
            // resolved before the backend runs so a bad range consumes no entries
            let dest = match memory.write_bytes(address, length) {
                Ok(dest) => dest,
                Err(e) => {
                    warn!(error = %e, "directory Read destination rejected");
                    return ResultCode::from(e);
                }
            };
            let mut entries = vec![DirectoryEntry::default(); count];
            let produced = self.backend.read(&mut entries).min(count);
            DirectoryEntry::encode_all(&entries[..produced], dest);
            produced
        };
        cmd.set_word(2, produced as u32);
        ResultCode::SUCCESS
    }

    /// Closes the backend; later closes are no-ops
    pub fn close(&mut self) {
        if !self.closed {
            self.backend.close();
            self.closed = true;
        }
    }
}

impl Drop for DirectorySession {
    fn drop(&mut self) {
        self.close();
    }
}
