//! Bridges from `embedded-hal` 0.2 peripherals to the bootloader traits

use embedded_hal::digital::v2::OutputPin;
use embedded_hal::serial;
use embedded_hal::spi::FullDuplex;

use super::{PeerBus, SerialLine};
use crate::protocol::SENTINEL;

/// Any `embedded-hal` serial port used as the host line.
pub struct SerialPort<U> {
    uart: U,
}

impl<U> SerialPort<U>
where
    U: serial::Read<u8> + serial::Write<u8>,
{
    pub fn new(uart: U) -> Self {
        Self { uart }
    }

    pub fn free(self) -> U {
        self.uart
    }
}

impl<U> SerialLine for SerialPort<U>
where
    U: serial::Read<u8> + serial::Write<u8>,
{
    fn read_byte_if_available(&mut self) -> Option<u8> {
        match self.uart.read() {
            Ok(byte) => Some(byte),
            Err(nb::Error::WouldBlock) => None,
            // framing/overrun: the byte is lost, same as no data
            Err(nb::Error::Other(_)) => None,
        }
    }

    fn write_byte(&mut self, byte: u8) {
        if nb::block!(self.uart.write(byte)).is_err() {
            log::trace!("serial write of {:#04x} dropped", byte);
        }
    }
}

/// SPI master plus the shared select line of the daughter controllers.
pub struct SpiPeers<SPI, CS> {
    spi: SPI,
    select: CS,
}

impl<SPI, CS> SpiPeers<SPI, CS>
where
    SPI: FullDuplex<u8>,
    CS: OutputPin,
{
    pub fn new(spi: SPI, select: CS) -> Self {
        Self { spi, select }
    }

    pub fn free(self) -> (SPI, CS) {
        (self.spi, self.select)
    }
}

impl<SPI, CS> PeerBus for SpiPeers<SPI, CS>
where
    SPI: FullDuplex<u8>,
    CS: OutputPin,
{
    fn set_chip_select(&mut self, asserted: bool) {
        // active low
        let result = if asserted {
            self.select.set_low()
        } else {
            self.select.set_high()
        };
        if result.is_err() {
            log::trace!("peer select line stuck, asserted = {}", asserted);
        }
    }

    fn exchange_byte(&mut self, byte: u8) -> u8 {
        if nb::block!(self.spi.send(byte)).is_err() {
            return SENTINEL;
        }
        nb::block!(self.spi.read()).unwrap_or(SENTINEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::pin::{Mock as PinMock, State, Transaction as PinTransaction};
    use embedded_hal_mock::serial::{Mock as SerialMock, Transaction as SerialTransaction};
    use embedded_hal_mock::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    struct Silent;

    impl serial::Read<u8> for Silent {
        type Error = ();
        fn read(&mut self) -> nb::Result<u8, ()> {
            Err(nb::Error::WouldBlock)
        }
    }

    impl serial::Write<u8> for Silent {
        type Error = ();
        fn write(&mut self, _: u8) -> nb::Result<(), ()> {
            Err(nb::Error::Other(()))
        }
        fn flush(&mut self) -> nb::Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn serial_reads_and_writes_pass_through() {
        let expectations = [
            SerialTransaction::read(b'@'),
            SerialTransaction::write(b'@'),
            SerialTransaction::write_many(b"$AA=="),
        ];
        let mut port = SerialPort::new(SerialMock::new(&expectations));

        assert_eq!(port.read_byte_if_available(), Some(b'@'));
        port.write_byte(b'@');
        port.write_bytes(b"$AA==");

        port.free().done();
    }

    #[test]
    fn serial_would_block_means_no_data() {
        let mut port = SerialPort::new(Silent);
        assert_eq!(port.read_byte_if_available(), None);
        // write errors are swallowed
        port.write_byte(b'.');
    }

    struct StuckPin;

    impl OutputPin for StuckPin {
        type Error = ();
        fn set_low(&mut self) -> Result<(), ()> {
            Err(())
        }
        fn set_high(&mut self) -> Result<(), ()> {
            Err(())
        }
    }

    #[test]
    fn failing_select_line_does_not_stop_the_exchange() {
        let spi = SpiMock::new(&[
            SpiTransaction::send(b'@'),
            SpiTransaction::read(0x21),
        ]);
        let mut peers = SpiPeers::new(spi, StuckPin);

        peers.set_chip_select(true);
        assert_eq!(peers.exchange_byte(b'@'), 0x21);
        peers.set_chip_select(false);

        let (mut spi, _) = peers.free();
        spi.done();
    }

    #[test]
    fn select_is_active_low() {
        let spi = SpiMock::new(&[]);
        let pin = PinMock::new(&[
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
        ]);
        let mut peers = SpiPeers::new(spi, pin);

        peers.set_chip_select(true);
        peers.set_chip_select(false);

        let (mut spi, mut pin) = peers.free();
        spi.done();
        pin.done();
    }

    #[test]
    fn exchange_sends_then_reads() {
        let spi = SpiMock::new(&[
            SpiTransaction::send(0x77),
            SpiTransaction::read(0x42),
        ]);
        let mut peers = SpiPeers::new(spi, PinMock::new(&[]));

        assert_eq!(peers.exchange_byte(0x77), 0x42);

        let (mut spi, mut pin) = peers.free();
        spi.done();
        pin.done();
    }
}
