//! Command line parsing and response framing

use core::iter;

use super::base64::{self, decoded_capacity, encoded_len};
use super::{Command, Relay, Status, ADDRESS_LEN, RESPONSE};
use crate::config::PAGE_SIZE;
use crate::hal::{PeerBus, SerialLine};

/// Tag, a full page write in Base64, and a few spare characters
pub const LINE_CAPACITY: usize = 1 + encoded_len(ADDRESS_LEN + PAGE_SIZE) + 4;

/// Largest payload a line of [`LINE_CAPACITY`] can decode to
pub const PAYLOAD_CAPACITY: usize = decoded_capacity(LINE_CAPACITY - 1);

/// Raw characters of one command line, terminator excluded
pub type LineBuffer = heapless::Vec<u8, LINE_CAPACITY>;

/// View of a received line: one tag character and a Base64 payload.
pub struct CommandLine<'a> {
    command: Command,
    payload: &'a [u8],
}

impl<'a> CommandLine<'a> {
    pub fn parse(line: &'a [u8]) -> Self {
        match line.split_first() {
            Some((&tag, payload)) => Self {
                command: Command::from_tag(tag),
                payload,
            },
            None => Self {
                command: Command::Unknown(0),
                payload: &[],
            },
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Decodes the payload into `scratch` and splits it into the page
    /// address and up to `max_data` bytes of page data.
    ///
    /// The address field is four big-endian bytes; only the low word may be
    /// non-zero.
    pub fn decode_address<'b>(
        &self,
        scratch: &'b mut [u8],
        max_data: usize,
    ) -> Result<(u16, &'b [u8]), Status> {
        let len = base64::decode(self.payload, scratch).map_err(|err| {
            log::debug!("payload rejected: {:?}", err);
            Status::IllegalSize
        })?;

        if len < ADDRESS_LEN || len - ADDRESS_LEN > max_data {
            log::debug!("payload of {} bytes has the wrong shape", len);
            return Err(Status::IllegalSize);
        }

        let (address, data) = scratch[..len].split_at(ADDRESS_LEN);
        if address[0] != 0 || address[1] != 0 {
            return Err(Status::IllegalAddress);
        }
        Ok((u16::from_be_bytes([address[2], address[3]]), data))
    }
}

/// `$` + Base64(status [+ data]) + CRLF
pub struct ResponseFrame<'a> {
    status: Status,
    data: &'a [u8],
}

impl<'a> ResponseFrame<'a> {
    pub fn status(status: Status) -> Self {
        Self { status, data: &[] }
    }

    pub fn with_data(status: Status, data: &'a [u8]) -> Self {
        Self { status, data }
    }

    pub fn send<S: SerialLine, B: PeerBus>(&self, relay: &mut Relay<S, B>) {
        relay.transmit(RESPONSE);
        let bytes = iter::once(self.status.code()).chain(self.data.iter().copied());
        base64::encode_with(bytes, |c| {
            relay.transmit(c);
        });
        relay.transmit_all(b"\r\n");
    }
}
