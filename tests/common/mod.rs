//! Simulated board for driving the bootloader from host tests
#![allow(dead_code)]

use std::collections::VecDeque;

use uc1_bootloader::bootloader::ERASED;
use uc1_bootloader::config::{FLASH_SIZE, PAGE_SIZE};
use uc1_bootloader::hal::{PeerBus, ProgramMemory, SerialLine, SystemControl};
use uc1_bootloader::protocol::base64;
use uc1_bootloader::protocol::SENTINEL;
use uc1_bootloader::{Bootloader, Settings};

// polls in a row without input before the host is considered gone
const SILENCE_LIMIT: usize = 10_000_000;

/// Host side of the serial line: scripted input, captured output.
#[derive(Default)]
pub struct HostLine {
    input: VecDeque<u8>,
    pub output: Vec<u8>,
    silent_polls: usize,
}

impl HostLine {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl SerialLine for HostLine {
    fn read_byte_if_available(&mut self) -> Option<u8> {
        match self.input.pop_front() {
            Some(byte) => {
                self.silent_polls = 0;
                Some(byte)
            }
            None => {
                self.silent_polls += 1;
                assert!(self.silent_polls < SILENCE_LIMIT, "loader waits on a silent host");
                None
            }
        }
    }

    fn write_byte(&mut self, byte: u8) {
        self.output.push(byte);
    }
}

/// Daisy chain of peers answering from a script, one reply per exchange.
#[derive(Default)]
pub struct DaisyChain {
    replies: VecDeque<u8>,
    pub sent: Vec<u8>,
    pub select: Vec<bool>,
}

impl DaisyChain {
    pub fn new(replies: &[u8]) -> Self {
        Self {
            replies: replies.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl PeerBus for DaisyChain {
    fn set_chip_select(&mut self, asserted: bool) {
        self.select.push(asserted);
    }

    fn exchange_byte(&mut self, byte: u8) -> u8 {
        self.sent.push(byte);
        self.replies.pop_front().unwrap_or(SENTINEL)
    }
}

/// Program memory with NOR semantics: erase sets bits, programming clears them.
pub struct SimFlash {
    pub cells: Vec<u8>,
    pub erased: Vec<u16>,
    pub programmed: Vec<u16>,
    /// Cell that ignores programming
    pub stuck: Option<u16>,
}

impl SimFlash {
    pub fn new() -> Self {
        Self {
            cells: vec![ERASED; FLASH_SIZE as usize],
            erased: Vec::new(),
            programmed: Vec::new(),
            stuck: None,
        }
    }

    pub fn page(&self, address: u16) -> &[u8] {
        &self.cells[address as usize..address as usize + PAGE_SIZE]
    }

    pub fn untouched(&self) -> bool {
        self.erased.is_empty() && self.programmed.is_empty()
    }
}

impl ProgramMemory for SimFlash {
    fn erase_page(&mut self, address: u16) {
        let start = address as usize / PAGE_SIZE * PAGE_SIZE;
        self.cells[start..start + PAGE_SIZE].fill(ERASED);
        self.erased.push(address);
    }

    fn program_page(&mut self, address: u16, page: &[u8]) {
        assert_eq!(page.len(), PAGE_SIZE, "partial page programmed");
        for (offset, &byte) in page.iter().enumerate() {
            let cell = address + offset as u16;
            if self.stuck != Some(cell) {
                self.cells[cell as usize] &= byte;
            }
        }
        self.programmed.push(address);
    }

    fn read_byte(&mut self, address: u16) -> u8 {
        self.cells[address as usize]
    }
}

#[derive(Default)]
pub struct SimControl {
    pub resets: usize,
    pub entries: Vec<u16>,
}

impl SystemControl for SimControl {
    fn force_reset(&mut self) {
        self.resets += 1;
    }

    fn transfer_control(&mut self, entry: u16) {
        self.entries.push(entry);
    }
}

pub type SimLoader = Bootloader<HostLine, DaisyChain, SimFlash, SimControl>;

pub fn settings(peers: u8) -> Settings {
    Settings {
        peers,
        poll_spins: 16,
        ..Settings::default()
    }
}

pub fn loader(input: &[u8]) -> SimLoader {
    Bootloader::new(
        HostLine::new(input),
        DaisyChain::default(),
        SimFlash::new(),
        SimControl::default(),
        settings(0),
    )
}

pub fn b64(bytes: &[u8]) -> Vec<u8> {
    let mut text = Vec::new();
    base64::encode_with(bytes.iter().copied(), |c| text.push(c));
    text
}

/// `<tag><base64(address ++ data)>\r\n`
pub fn command(tag: u8, address: u32, data: &[u8]) -> Vec<u8> {
    let mut payload = address.to_be_bytes().to_vec();
    payload.extend_from_slice(data);
    let mut line = vec![tag];
    line.extend(b64(&payload));
    line.extend_from_slice(b"\r\n");
    line
}

/// `$<base64(status ++ data)>\r\n`
pub fn response(status: u8, data: &[u8]) -> Vec<u8> {
    let mut bytes = vec![status];
    bytes.extend_from_slice(data);
    let mut frame = vec![b'$'];
    frame.extend(b64(&bytes));
    frame.extend_from_slice(b"\r\n");
    frame
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
