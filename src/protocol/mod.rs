//! Wire protocol: handshake, command lines and response frames
//!
//! ```text
//! host   -> @0                     handshake, channel 0 (this device)
//! host   -> w<base64(addr + page)>\r\n
//! loader <- $<base64(status)>\r\n
//! ```

pub mod base64;
pub mod frame;
pub mod relay;

pub use frame::{CommandLine, ResponseFrame};
pub use relay::Relay;

/// Starts a handshake, and aborts a line in progress
pub const WAKE: u8 = b'@';
/// First character of every response line
pub const RESPONSE: u8 = b'$';
/// Printed once per idle tick
pub const IDLE_MARKER: u8 = b'.';
/// "No data" on the peer bus
pub const SENTINEL: u8 = 0xff;
/// Printed on the serial line in place of the sentinel
pub const SENTINEL_PLACEHOLDER: u8 = b'?';

/// Bytes of the address field at the start of `w` and `r` payloads
pub const ADDRESS_LEN: usize = 4;

#[inline]
pub fn is_line_end(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n' || byte == 0
}

/// First byte of every response. Values are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    UnknownCommand = 1,
    VerifyFailed = 3,
    IllegalSize = 4,
    IllegalAddress = 5,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    WritePage,
    ReadPage,
    Execute,
    Reboot,
    Unknown(u8),
}

impl Command {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            b'w' => Command::WritePage,
            b'r' => Command::ReadPage,
            b'x' => Command::Execute,
            b'b' => Command::Reboot,
            other => Command::Unknown(other),
        }
    }
}
