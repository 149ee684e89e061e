use std::env;

// (make-style define, exported name, default)
const PARAMETERS: &[(&str, &str, &str)] = &[
    ("F_CPU", "LOADER_CPU_FREQ_HZ", "12000000"),
    ("BAUDRATE", "LOADER_BAUDRATE", "57600"),
    ("BOOTADR", "LOADER_BOOT_ADDRESS", "0x7000"),
    ("SPM_PAGESIZE", "LOADER_PAGE_SIZE", "128"),
    ("FLASH_SIZE", "LOADER_FLASH_SIZE", "0x8000"),
    ("SPI_SLAVES", "LOADER_PEER_COUNT", "1"),
];

fn parse(name: &str, raw: &str) -> u32 {
    let raw = raw.trim().replace('_', "");
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.unwrap_or_else(|_| panic!("{} must be a number, got {:?}", name, raw))
}

fn main() {
    let mut values = Vec::with_capacity(PARAMETERS.len());
    for &(name, exported, default) in PARAMETERS {
        println!("cargo:rerun-if-env-changed={}", name);
        let raw = env::var(name).unwrap_or_else(|_| default.to_string());
        let value = parse(name, &raw);
        println!("cargo:rustc-env={}={}", exported, value);
        values.push(value);
    }

    let (cpu, baud, boot, page, flash, peers) =
        (values[0], values[1], values[2], values[3], values[4], values[5]);

    if baud == 0 || cpu / baud < 8 {
        panic!("BAUDRATE {} is not reachable with F_CPU {}", baud, cpu);
    }
    if !page.is_power_of_two() || !(2..=256).contains(&page) {
        panic!("SPM_PAGESIZE must be a power of two between 2 and 256");
    }
    if flash > 0x1_0000 {
        panic!("FLASH_SIZE above 64 KiB needs RAMPZ handling, which is not supported");
    }
    if boot % page != 0 || boot > flash {
        panic!("BOOTADR {:#x} must be page aligned and inside flash", boot);
    }
    if peers > 9 {
        panic!("SPI_SLAVES must fit a single channel digit (0..=9)");
    }

    // Host builds only compile the protocol core for tests
    if env::var("CARGO_CFG_TARGET_ARCH").map_or(false, |arch| arch == "avr") {
        println!("cargo:rustc-link-arg=-mmcu=atmega324p");
        println!("cargo:rustc-link-arg=-Wl,--section-start=.text={:#x}", boot);
        println!(
            "cargo:warning=Building bootloader at {:#06x}, {} byte pages, {} peer(s)",
            boot, page, peers
        );
    }
}
