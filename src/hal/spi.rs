//! SPI master and peer-select line for the relay bus

use avr_device::atmega644::{PORTB, SPI};
use core::convert::Infallible;
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::spi::FullDuplex;

// PB4 = /SS (peer select), PB5 = MOSI, PB7 = SCK
const SELECT: u8 = 1 << 4;
const MOSI: u8 = 1 << 5;
const SCK: u8 = 1 << 7;

const SPE: u8 = 1 << 6;
const MSTR: u8 = 1 << 4;
const SPIF: u8 = 1 << 7;

/// SPI master, mode 0, MSB first, Fosc/4.
pub struct Spi {
    spi: SPI,
    pending: bool,
}

impl Spi {
    /// Configures the bus pins and returns the master plus its select line.
    pub fn new(spi: SPI, portb: PORTB) -> (Self, PeerSelect) {
        unsafe {
            portb.ddrb.modify(|r, w| w.bits(r.bits() | SCK | MOSI | SELECT));
            portb.portb.modify(|r, w| w.bits(r.bits() | SELECT));
            spi.spcr.write(|w| w.bits(SPE | MSTR));
        }
        (
            Self {
                spi,
                pending: false,
            },
            PeerSelect { port: portb },
        )
    }
}

impl FullDuplex<u8> for Spi {
    type Error = Infallible;

    fn send(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        if self.pending {
            return Err(nb::Error::WouldBlock);
        }
        self.spi.spdr.write(|w| unsafe { w.bits(byte) });
        self.pending = true;
        Ok(())
    }

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        if self.spi.spsr.read().bits() & SPIF == 0 {
            return Err(nb::Error::WouldBlock);
        }
        self.pending = false;
        Ok(self.spi.spdr.read().bits())
    }
}

/// Shared /SS line of the daughter controllers on PB4.
pub struct PeerSelect {
    port: PORTB,
}

impl OutputPin for PeerSelect {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.port
            .portb
            .modify(|r, w| unsafe { w.bits(r.bits() & !SELECT) });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.port
            .portb
            .modify(|r, w| unsafe { w.bits(r.bits() | SELECT) });
        Ok(())
    }
}
