//! Erase/program/verify of single program-memory pages

use crate::config::PAGE_SIZE;
use crate::hal::ProgramMemory;
use crate::protocol::Status;

/// Content of an erased flash cell, also used to pad short writes
pub const ERASED: u8 = 0xff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramError {
    /// More data than fits one page
    IllegalSize { len: usize },
    /// Unaligned, past the end of flash, or inside the loader
    IllegalAddress { address: u16 },
    /// Read-back differs from what was programmed
    VerifyMismatch { address: u16, offset: usize },
}

impl ProgramError {
    pub fn status(self) -> Status {
        match self {
            ProgramError::IllegalSize { .. } => Status::IllegalSize,
            ProgramError::IllegalAddress { .. } => Status::IllegalAddress,
            ProgramError::VerifyMismatch { .. } => Status::VerifyFailed,
        }
    }
}

pub type Result<T> = core::result::Result<T, ProgramError>;

pub struct PageProgrammer<M> {
    memory: M,
    boot_address: u16,
    flash_size: u32,
    page: [u8; PAGE_SIZE],
}

impl<M: ProgramMemory> PageProgrammer<M> {
    /// `boot_address` is the first byte the loader itself occupies.
    pub fn new(memory: M, boot_address: u16, flash_size: u32) -> Self {
        Self {
            memory,
            boot_address,
            flash_size,
            page: [ERASED; PAGE_SIZE],
        }
    }

    /// Programs one page with `data`, padded to a full page with [`ERASED`].
    ///
    /// Nothing is erased unless the request passes every check. A failed
    /// verify leaves the page as the hardware left it.
    pub fn write_page(&mut self, address: u16, data: &[u8]) -> Result<()> {
        if data.len() > PAGE_SIZE {
            return Err(ProgramError::IllegalSize { len: data.len() });
        }
        let end = address as u32 + PAGE_SIZE as u32;
        if address as usize % PAGE_SIZE != 0 || end > self.boot_address as u32 {
            return Err(ProgramError::IllegalAddress { address });
        }

        self.page[..data.len()].copy_from_slice(data);
        self.page[data.len()..].fill(ERASED);

        self.memory.erase_page(address);
        self.memory.program_page(address, &self.page);

        self.verify(address)
    }

    /// Reads the page starting at `address`.
    pub fn read_page(&mut self, address: u16) -> Result<&[u8; PAGE_SIZE]> {
        if address as u32 + PAGE_SIZE as u32 > self.flash_size {
            return Err(ProgramError::IllegalAddress { address });
        }
        for (offset, byte) in self.page.iter_mut().enumerate() {
            *byte = self.memory.read_byte(address + offset as u16);
        }
        Ok(&self.page)
    }

    fn verify(&mut self, address: u16) -> Result<()> {
        for (offset, &expected) in self.page.iter().enumerate() {
            if self.memory.read_byte(address + offset as u16) != expected {
                log::warn!("verify failed at {:#06x}", address as usize + offset);
                return Err(ProgramError::VerifyMismatch { address, offset });
            }
        }
        Ok(())
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }
}
