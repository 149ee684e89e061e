//! Command session state machine
//!
//! The loader idles printing `.` until a handshake `@<channel>` arrives,
//! then reads command lines until the host hands off, reboots, or goes
//! quiet for [`Settings::idle_ticks`] ticks.

pub mod programmer;

use crate::config::{self, MCU_NAME, PAGE_SIZE, VERSION_MAJOR, VERSION_MINOR};
use crate::hal::{PeerBus, ProgramMemory, SerialLine, SystemControl};
use crate::protocol::frame::{LineBuffer, PAYLOAD_CAPACITY};
use crate::protocol::{
    is_line_end, Command, CommandLine, Relay, ResponseFrame, Status, IDLE_MARKER, SENTINEL, WAKE,
};

pub use programmer::{PageProgrammer, ProgramError, ERASED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub peers: u8,
    pub boot_address: u16,
    pub flash_size: u32,
    pub application_entry: u16,
    /// Receive attempts per idle tick
    pub poll_spins: u16,
    pub idle_ticks: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            peers: config::PEER_COUNT,
            boot_address: config::BOOT_ADDRESS,
            flash_size: config::FLASH_SIZE,
            application_entry: config::APPLICATION_ENTRY,
            poll_spins: config::POLL_SPINS,
            idle_ticks: config::IDLE_TICKS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Dormant,
    /// `@` seen, waiting for the channel digit
    Armed,
}

/// How a command session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Dormant,
    /// `@` arrived mid-line; the next byte is a channel digit
    ReArmed,
    HandedOff,
    SelfReset,
}

/// Why the loader stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    HandedOff,
    SelfReset,
}

pub struct Bootloader<S, B, M, C> {
    relay: Relay<S, B>,
    programmer: PageProgrammer<M>,
    control: C,
    settings: Settings,
    state: State,
    idle_ticks: u8,
    line: LineBuffer,
    payload: [u8; PAYLOAD_CAPACITY],
}

impl<S, B, M, C> Bootloader<S, B, M, C>
where
    S: SerialLine,
    B: PeerBus,
    M: ProgramMemory,
    C: SystemControl,
{
    pub fn new(serial: S, bus: B, memory: M, control: C, settings: Settings) -> Self {
        Self {
            relay: Relay::new(serial, bus, settings.peers),
            programmer: PageProgrammer::new(memory, settings.boot_address, settings.flash_size),
            control,
            settings,
            state: State::Dormant,
            idle_ticks: 0,
            line: LineBuffer::new(),
            payload: [0; PAYLOAD_CAPACITY],
        }
    }

    /// Announces the loader and serves sessions until it hands off or
    /// resets. On the target the final control transfer does not return.
    pub fn run(&mut self) -> Exit {
        self.announce();
        loop {
            if let Some(exit) = self.tick() {
                return self.finish(exit);
            }
        }
    }

    /// Prints the identification line the host waits for after a reset.
    pub fn announce(&mut self) {
        let mut console = Console(self.relay.serial());
        let _ = ufmt::uwrite!(
            console,
            "\r\n#0({} {} relay-bootloader V{}.{})\r\n",
            MCU_NAME,
            PAGE_SIZE,
            VERSION_MAJOR,
            VERSION_MINOR
        );
    }

    /// One pass of the idle loop: a bounded poll for one byte, handling of
    /// that byte (possibly a whole session), then idle accounting.
    pub fn tick(&mut self) -> Option<Exit> {
        if let Some(byte) = self.poll() {
            match self.on_idle_byte(byte) {
                Some(SessionEnd::HandedOff) => return Some(Exit::HandedOff),
                Some(SessionEnd::SelfReset) => return Some(Exit::SelfReset),
                _ => {}
            }
        }

        // an armed loader keeps counting, it just stops printing markers
        if self.state != State::Armed {
            self.relay.serial().write_byte(IDLE_MARKER);
        }
        self.idle_ticks = self.idle_ticks.saturating_add(1);

        if self.idle_ticks >= self.settings.idle_ticks {
            log::info!("no handshake for {} ticks, starting application", self.idle_ticks);
            return Some(Exit::HandedOff);
        }
        None
    }

    fn finish(&mut self, exit: Exit) -> Exit {
        match exit {
            Exit::HandedOff => self.control.transfer_control(self.settings.application_entry),
            Exit::SelfReset => self.control.force_reset(),
        }
        exit
    }

    fn poll(&mut self) -> Option<u8> {
        let serial = self.relay.serial();
        (0..self.settings.poll_spins).find_map(|_| serial.read_byte_if_available())
    }

    fn arm(&mut self) {
        self.state = State::Armed;
        self.idle_ticks = 0;
        self.relay.select(0);
        self.relay.transmit(WAKE);
    }

    fn on_idle_byte(&mut self, byte: u8) -> Option<SessionEnd> {
        if is_line_end(byte) {
            self.state = State::Dormant;
            return None;
        }
        if byte == WAKE {
            self.arm();
            return None;
        }
        if self.state != State::Armed {
            return None;
        }

        self.state = State::Dormant;
        if !byte.is_ascii_digit() || !self.relay.select(byte - b'0') {
            log::trace!("handshake dropped at {:#04x}", byte);
            return None;
        }
        self.relay.transmit(byte);
        self.idle_ticks = 0;

        let end = self.session();
        if end == SessionEnd::ReArmed {
            self.arm();
        }
        Some(end)
    }

    /// Serves one command line on the selected channel.
    fn session(&mut self) -> SessionEnd {
        self.line.clear();
        loop {
            let Some(byte) = self.relay.serial().read_byte_if_available() else {
                continue;
            };

            if byte == WAKE {
                log::debug!("line aborted by a new handshake");
                return SessionEnd::ReArmed;
            }

            if self.relay.channel() != 0 {
                // the peer parses the line; a silent peer ends the session
                let reply = self.relay.transmit(byte);
                if reply == 0 || reply == SENTINEL {
                    return SessionEnd::Dormant;
                }
                continue;
            }

            if is_line_end(byte) {
                let end = self.dispatch();
                self.line.clear();
                return end;
            }

            // bytes past the capacity are dropped and not echoed
            if self.line.push(byte).is_ok() {
                self.relay.transmit(byte);
            }
        }
    }

    fn dispatch(&mut self) -> SessionEnd {
        let line = CommandLine::parse(&self.line);
        log::debug!("command {:?}, {} payload bytes", line.command(), line.payload().len());

        match line.command() {
            Command::WritePage => {
                let status = match line.decode_address(&mut self.payload, PAGE_SIZE) {
                    Ok((address, data)) => match self.programmer.write_page(address, data) {
                        Ok(()) => Status::Ok,
                        Err(err) => {
                            log::debug!("write rejected: {:?}", err);
                            err.status()
                        }
                    },
                    Err(status) => status,
                };
                ResponseFrame::status(status).send(&mut self.relay);
                SessionEnd::Dormant
            }
            Command::ReadPage => {
                let page = line
                    .decode_address(&mut self.payload, 0)
                    .and_then(|(address, _)| {
                        self.programmer.read_page(address).map_err(ProgramError::status)
                    });
                match page {
                    Ok(page) => ResponseFrame::with_data(Status::Ok, page).send(&mut self.relay),
                    Err(status) => ResponseFrame::status(status).send(&mut self.relay),
                }
                SessionEnd::Dormant
            }
            Command::Execute => {
                ResponseFrame::status(Status::Ok).send(&mut self.relay);
                SessionEnd::HandedOff
            }
            Command::Reboot => {
                ResponseFrame::status(Status::Ok).send(&mut self.relay);
                SessionEnd::SelfReset
            }
            Command::Unknown(_) => {
                ResponseFrame::status(Status::UnknownCommand).send(&mut self.relay);
                SessionEnd::Dormant
            }
        }
    }

    pub fn relay(&mut self) -> &mut Relay<S, B> {
        &mut self.relay
    }

    pub fn programmer(&mut self) -> &mut PageProgrammer<M> {
        &mut self.programmer
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn idle_ticks(&self) -> u8 {
        self.idle_ticks
    }

    pub fn is_armed(&self) -> bool {
        self.state == State::Armed
    }
}

/// `ufmt` sink writing straight to the host line.
struct Console<'a, S>(&'a mut S);

impl<S: SerialLine> ufmt::uWrite for Console<'_, S> {
    type Error = core::convert::Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.0.write_bytes(s.as_bytes());
        Ok(())
    }
}
