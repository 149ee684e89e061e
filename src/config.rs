//! Build-time configuration constants.
//!
//! Values come from the environment at build time (`F_CPU`, `BAUDRATE`,
//! `BOOTADR`, `SPM_PAGESIZE`, `FLASH_SIZE`, `SPI_SLAVES`); `build.rs`
//! validates them and re-exports them under `LOADER_*` names.

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = parse(env!("LOADER_CPU_FREQ_HZ"));

/// UART baud rate
pub const UART_BAUD: u32 = parse(env!("LOADER_BAUDRATE"));

/// Self-programming page size of the target's flash
pub const PAGE_SIZE: usize = parse(env!("LOADER_PAGE_SIZE")) as usize;

/// First byte address occupied by the bootloader; writes at or above are refused
pub const BOOT_ADDRESS: u16 = parse(env!("LOADER_BOOT_ADDRESS")) as u16;

/// Total program memory in bytes
pub const FLASH_SIZE: u32 = parse(env!("LOADER_FLASH_SIZE"));

/// Number of daughter controllers on the SPI relay bus
pub const PEER_COUNT: u8 = parse(env!("LOADER_PEER_COUNT")) as u8;

/// Entry point of the resident application
pub const APPLICATION_ENTRY: u16 = 0x0000;

/// Receive attempts per idle tick
pub const POLL_SPINS: u16 = 0x3000;

/// Idle ticks without a handshake before the application is started
pub const IDLE_TICKS: u8 = 100;

/// UBRR value for double-speed asynchronous mode, rounded to nearest
pub const UBRR_DOUBLE_SPEED: u16 = ((CPU_FREQ_HZ / UART_BAUD + 4) / 8 - 1) as u16;

pub const MCU_NAME: &str = "atmega324p";
pub const VERSION_MAJOR: u8 = 0x02;
pub const VERSION_MINOR: u8 = 0x00;

/// Marker stored in the version table so the application can find the loader
pub const TABLE_MAGIC: u16 = 0x1234;

pub const WELCOME_CAPACITY: usize = 48;

/// NUL-terminated identification text referenced from the version table.
/// Same wording as the banner, without the surrounding line breaks.
pub const WELCOME: [u8; WELCOME_CAPACITY] = welcome();

const fn welcome() -> [u8; WELCOME_CAPACITY] {
    let out = [0u8; WELCOME_CAPACITY];
    let (out, at) = put_text(out, 0, b"#0(");
    let (out, at) = put_text(out, at, MCU_NAME.as_bytes());
    let (out, at) = put_text(out, at, b" ");
    let (out, at) = put_number(out, at, PAGE_SIZE);
    let (out, at) = put_text(out, at, b" relay-bootloader V");
    let (out, at) = put_number(out, at, VERSION_MAJOR as usize);
    let (out, at) = put_text(out, at, b".");
    let (out, at) = put_number(out, at, VERSION_MINOR as usize);
    let (out, at) = put_text(out, at, b")");
    // keep the terminator
    assert!(at < WELCOME_CAPACITY);
    out
}

const fn put_text(
    mut out: [u8; WELCOME_CAPACITY],
    mut at: usize,
    text: &[u8],
) -> ([u8; WELCOME_CAPACITY], usize) {
    let mut i = 0;
    while i < text.len() {
        out[at] = text[i];
        at += 1;
        i += 1;
    }
    (out, at)
}

const fn put_number(
    mut out: [u8; WELCOME_CAPACITY],
    mut at: usize,
    value: usize,
) -> ([u8; WELCOME_CAPACITY], usize) {
    let mut divisor = 1;
    while value / divisor >= 10 {
        divisor *= 10;
    }
    while divisor > 0 {
        out[at] = b'0' + (value / divisor % 10) as u8;
        at += 1;
        divisor /= 10;
    }
    (out, at)
}

const fn parse(value: &str) -> u32 {
    let bytes = value.as_bytes();
    let mut acc: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = match bytes[i] {
            b'0'..=b'9' => bytes[i] - b'0',
            _ => panic!("non-decimal build parameter"),
        };
        acc = acc * 10 + digit as u32;
        i += 1;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_parameters() {
        assert_eq!(parse("0"), 0);
        assert_eq!(parse("28672"), 0x7000);
    }

    #[test]
    fn welcome_text_matches_banner_wording() {
        let text = format!(
            "#0({} {} relay-bootloader V{}.{})",
            MCU_NAME, PAGE_SIZE, VERSION_MAJOR, VERSION_MINOR
        );
        assert_eq!(&WELCOME[..text.len()], text.as_bytes());
        assert_eq!(WELCOME[text.len()], 0);
    }

    #[test]
    fn boot_address_is_page_aligned() {
        assert_eq!(BOOT_ADDRESS as usize % PAGE_SIZE, 0);
        assert!(BOOT_ADDRESS as u32 <= FLASH_SIZE);
    }
}
