//! Polled USART0 driver
//!
//! The loader runs with interrupts disabled, so reception is a plain check
//! of RXC0 and transmission waits on UDRE0.

use avr_device::atmega644::USART0;
use core::convert::Infallible;
use embedded_hal::serial;

use crate::config::UBRR_DOUBLE_SPEED;

const RXC: u8 = 1 << 7;
const UDRE: u8 = 1 << 5;
const U2X: u8 = 1 << 1;
const RXEN: u8 = 1 << 4;
const TXEN: u8 = 1 << 3;
// asynchronous, 8 data bits, no parity, 1 stop bit
const FRAME_8N1: u8 = 0x06;

pub struct Uart {
    usart: USART0,
}

impl Uart {
    pub fn new(usart: USART0) -> Self {
        unsafe {
            usart.ucsr0a.write(|w| w.bits(U2X));
            usart.ucsr0c.write(|w| w.bits(FRAME_8N1));
            usart.ubrr0.write(|w| w.bits(UBRR_DOUBLE_SPEED));
            usart.ucsr0b.write(|w| w.bits(RXEN | TXEN));
        }
        Self { usart }
    }

    #[inline]
    fn status(&self) -> u8 {
        self.usart.ucsr0a.read().bits()
    }
}

impl serial::Read<u8> for Uart {
    type Error = Infallible;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        if self.status() & RXC == 0 {
            return Err(nb::Error::WouldBlock);
        }
        Ok(self.usart.udr0.read().bits())
    }
}

impl serial::Write<u8> for Uart {
    type Error = Infallible;

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        if self.status() & UDRE == 0 {
            return Err(nb::Error::WouldBlock);
        }
        self.usart.udr0.write(|w| unsafe { w.bits(byte) });
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        if self.status() & UDRE == 0 {
            return Err(nb::Error::WouldBlock);
        }
        Ok(())
    }
}
