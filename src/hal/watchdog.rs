use avr_device::atmega644::{CPU, WDT};

use super::SystemControl;

const WDCE: u8 = 1 << 4;
const WDE: u8 = 1 << 3;
const WDRF: u8 = 1 << 3;

// WDP bits for the shortest timeout, about 16 ms
const TIMEOUT_16MS: u8 = 0x00;

pub struct Watchdog {
    wdt: WDT,
}

impl Watchdog {
    #[inline]
    pub fn new(wdt: WDT) -> Self {
        Self { wdt }
    }

    /// Turns the watchdog off. A reset triggered by `b` leaves it running,
    /// so this has to happen before anything slow.
    #[inline]
    pub fn disable(&mut self, cpu: &CPU) {
        avr_device::interrupt::free(|_| unsafe {
            cpu.mcusr.modify(|r, w| w.bits(r.bits() & !WDRF));
            // timed sequence
            self.wdt.wdtcsr.write(|w| w.bits(WDCE | WDE));
            self.wdt.wdtcsr.write(|w| w.bits(0x00));
        });
    }

    /// Arms a reset after the shortest timeout.
    #[inline]
    pub fn start(&mut self) {
        avr_device::interrupt::free(|_| unsafe {
            self.wdt.wdtcsr.write(|w| w.bits(WDCE | WDE));
            self.wdt.wdtcsr.write(|w| w.bits(WDE | TIMEOUT_16MS));
        });
    }
}

/// Control transfers on the real part.
pub struct Board {
    watchdog: Watchdog,
}

impl Board {
    pub fn new(watchdog: Watchdog) -> Self {
        Self { watchdog }
    }
}

impl SystemControl for Board {
    fn force_reset(&mut self) {
        self.watchdog.start();
        #[allow(clippy::empty_loop)]
        loop {}
    }

    fn transfer_control(&mut self, entry: u16) {
        // `entry` is a byte address; ijmp takes a word address in Z
        unsafe {
            core::arch::asm!("ijmp", in("Z") entry >> 1, options(noreturn));
        }
    }
}
