//! Self-programming of the application section through SPM
//!
//! The loader lives in the no-read-while-write section, so the CPU halts
//! during erase and write and the RWW section is re-enabled afterwards.

use avr_device::atmega644::{CPU, EEPROM};
use core::arch::asm;

use super::ProgramMemory;

// SPMCSR bits
const SPMEN: u8 = 1 << 0;
const PGERS: u8 = 1 << 1;
const PGWRT: u8 = 1 << 2;
const RWWSRE: u8 = 1 << 4;

const EEPE: u8 = 1 << 1;

// I/O address of SPMCSR, for `out`
const SPMCSR_IO: u8 = 0x37;

pub struct Flash {
    cpu: CPU,
    eeprom: EEPROM,
}

impl Flash {
    pub fn new(cpu: CPU, eeprom: EEPROM) -> Self {
        Self { cpu, eeprom }
    }

    fn wait_spm(&self) {
        while self.cpu.spmcsr.read().bits() & SPMEN != 0 {}
    }

    fn wait_eeprom(&self) {
        while self.eeprom.eecr.read().bits() & EEPE != 0 {}
    }

    /// Issues one SPM instruction with Z = `address` and r1:r0 = `word`.
    fn spm(&self, command: u8, address: u16, word: u16) {
        self.wait_spm();
        unsafe {
            asm!(
                "movw r0, {word}",
                "out {spmcsr}, {command}",
                "spm",
                "clr r1",
                word = in(reg_iw) word,
                command = in(reg) command,
                spmcsr = const SPMCSR_IO,
                in("Z") address,
            );
        }
        self.wait_spm();
    }
}

impl ProgramMemory for Flash {
    fn erase_page(&mut self, address: u16) {
        self.wait_eeprom();
        self.spm(PGERS | SPMEN, address, 0);
    }

    fn program_page(&mut self, address: u16, page: &[u8]) {
        // the temporary page buffer is filled one little-endian word at a time
        for (offset, pair) in page.chunks_exact(2).enumerate() {
            let word = u16::from_le_bytes([pair[0], pair[1]]);
            self.spm(SPMEN, address + 2 * offset as u16, word);
        }
        self.spm(PGWRT | SPMEN, address, 0);
        self.spm(RWWSRE | SPMEN, address, 0);
    }

    fn read_byte(&mut self, address: u16) -> u8 {
        let byte: u8;
        unsafe {
            asm!(
                "lpm {byte}, Z",
                byte = out(reg) byte,
                in("Z") address,
                options(readonly, nostack),
            );
        }
        byte
    }
}
