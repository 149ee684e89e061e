//! Resident serial bootloader for ATmega324P with an SPI relay to
//! daughter controllers.
//!
//! The protocol core (`protocol`, `bootloader`) is target independent and
//! runs against the traits in [`hal`]; the register-level drivers behind
//! them are only built for AVR.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(asm_experimental_arch))]

pub mod bootloader;
pub mod config;
pub mod hal;
pub mod protocol;

pub use bootloader::{Bootloader, Exit, SessionEnd, Settings};
pub use protocol::Status;
