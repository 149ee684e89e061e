//! Channel relay between the host serial line and the peer SPI bus
//!
//! Every byte of a session goes through [`Relay::transmit`]. With peers
//! attached, the byte is clocked into each peer slot of the daisy chain
//! followed by one sentinel byte, and the reply of the selected channel is
//! what the host sees echoed.

use super::{SENTINEL, SENTINEL_PLACEHOLDER};
use crate::hal::{PeerBus, SerialLine};

pub struct Relay<S, B> {
    serial: S,
    bus: B,
    peers: u8,
    channel: u8,
}

impl<S: SerialLine, B: PeerBus> Relay<S, B> {
    pub fn new(serial: S, bus: B, peers: u8) -> Self {
        Self {
            serial,
            bus,
            peers,
            channel: 0,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Selects the channel used by subsequent transmissions.
    ///
    /// Returns `false` and keeps channel 0 if no such peer exists.
    pub fn select(&mut self, channel: u8) -> bool {
        if channel > self.peers {
            self.channel = 0;
            return false;
        }
        self.channel = channel;
        true
    }

    /// Sends `byte` to the peers, echoes the selected reply on the serial
    /// line and returns it.
    pub fn transmit(&mut self, byte: u8) -> u8 {
        let mut reply = byte;

        if self.peers > 0 {
            self.bus.set_chip_select(true);
            for slot in 0..=self.peers {
                let out = if slot == self.peers { SENTINEL } else { byte };
                let received = self.bus.exchange_byte(out);
                if self.channel > 0 && slot == self.channel {
                    reply = received;
                }
            }
            self.bus.set_chip_select(false);
        }

        self.serial.write_byte(if reply == SENTINEL {
            SENTINEL_PLACEHOLDER
        } else {
            reply
        });
        reply
    }

    pub fn transmit_all(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.transmit(byte);
        }
    }

    /// Direct access to the host line, bypassing the peers.
    pub fn serial(&mut self) -> &mut S {
        &mut self.serial
    }

    pub fn bus(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn release(self) -> (S, B) {
        (self.serial, self.bus)
    }
}
