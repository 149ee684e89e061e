#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;
    use avr_device::atmega644::Peripherals;

    use uc1_bootloader::config::{
        TABLE_MAGIC, VERSION_MAJOR, VERSION_MINOR, WELCOME, WELCOME_CAPACITY,
    };
    use uc1_bootloader::hal::flash::Flash;
    use uc1_bootloader::hal::spi::Spi;
    use uc1_bootloader::hal::uart::Uart;
    use uc1_bootloader::hal::watchdog::{Board, Watchdog};
    use uc1_bootloader::hal::{SerialPort, SpiPeers};
    use uc1_bootloader::{Bootloader, Settings};

    #[used]
    #[link_section = ".table"]
    static WELCOME_MESSAGE: [u8; WELCOME_CAPACITY] = WELCOME;

    /// Fixed-location record the application can use to find the loader.
    /// Layout: welcome text pointer, main version, sub version, magic.
    #[repr(C)]
    pub struct VersionTable {
        welcome: *const u8,
        main_version: u8,
        sub_version: u8,
        magic: u16,
    }

    // read-only, and only ever read by the application
    unsafe impl Sync for VersionTable {}

    #[used]
    #[link_section = ".table"]
    static TABLE: VersionTable = VersionTable {
        welcome: &WELCOME_MESSAGE as *const [u8; WELCOME_CAPACITY] as *const u8,
        main_version: VERSION_MAJOR,
        sub_version: VERSION_MINOR,
        magic: TABLE_MAGIC,
    };

    #[avr_device::entry]
    fn main() -> ! {
        let dp = match Peripherals::take() {
            Some(dp) => dp,
            None => loop {},
        };

        // interrupts stay off for the whole lifetime of the loader
        avr_device::interrupt::disable();

        let mut watchdog = Watchdog::new(dp.WDT);
        watchdog.disable(&dp.CPU);

        let serial = SerialPort::new(Uart::new(dp.USART0));
        let (spi, select) = Spi::new(dp.SPI, dp.PORTB);
        let flash = Flash::new(dp.CPU, dp.EEPROM);

        let mut loader = Bootloader::new(
            serial,
            SpiPeers::new(spi, select),
            flash,
            Board::new(watchdog),
            Settings::default(),
        );
        loader.run();

        // both exits transfer control, so this is never reached
        #[allow(clippy::empty_loop)]
        loop {}
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {
    eprintln!("uc1_bootloader is firmware for AVR targets; use `cargo test` on the host");
}
