//! Hardware access used by the bootloader core.
//!
//! The protocol and session code only talk to these traits. On the target
//! they are backed by the register-level drivers in this module; on the host
//! they are backed by simulations and `embedded-hal-mock`.

pub mod adapters;

#[cfg(target_arch = "avr")]
pub mod flash;
#[cfg(target_arch = "avr")]
pub mod spi;
#[cfg(target_arch = "avr")]
pub mod uart;
#[cfg(target_arch = "avr")]
pub mod watchdog;

pub use adapters::{SerialPort, SpiPeers};

/// Host-facing serial line.
pub trait SerialLine {
    /// Returns a byte only if one has already been received.
    fn read_byte_if_available(&mut self) -> Option<u8>;

    /// Blocks until the byte has been handed to the transmitter.
    fn write_byte(&mut self, byte: u8);

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }
}

/// Synchronous secondary bus shared by the daughter controllers.
pub trait PeerBus {
    /// `true` pulls the shared select line active.
    fn set_chip_select(&mut self, asserted: bool);

    /// Shifts one byte out and returns the byte shifted in.
    fn exchange_byte(&mut self, byte: u8) -> u8;
}

/// Self-programmable program memory, addressed in bytes.
pub trait ProgramMemory {
    /// Erases the page containing `address`; blocks until done.
    fn erase_page(&mut self, address: u16);

    /// Programs one erased page from `page`, which holds exactly one page.
    fn program_page(&mut self, address: u16, page: &[u8]);

    fn read_byte(&mut self, address: u16) -> u8;
}

/// Control transfers requested by the session layer.
///
/// On the target neither call returns.
pub trait SystemControl {
    /// Resets the MCU so execution restarts at the loader's own entry.
    fn force_reset(&mut self);

    /// Leaves the loader and starts the code at `entry`.
    fn transfer_control(&mut self, entry: u16);
}

/// Peer bus for boards without daughter controllers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPeers;

impl PeerBus for NoPeers {
    fn set_chip_select(&mut self, _asserted: bool) {}

    fn exchange_byte(&mut self, _byte: u8) -> u8 {
        crate::protocol::SENTINEL
    }
}
