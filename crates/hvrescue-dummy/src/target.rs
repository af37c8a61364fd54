//! In-memory AVR target

use alloc::vec::Vec;

use hvrescue_core::device::{is_lock_mode_3, DeviceDescriptor, FuseLocation, FuseSet};
use hvrescue_core::programmer::{Direction, Level, ParallelPins, Signal, SIGNAL_COUNT};
use hvrescue_core::protocol::opcodes;

/// Configuration for the simulated target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// 24-bit signature, byte 0 most significant
    pub signature: u32,
    /// Initial fuse bytes
    pub fuses: FuseSet,
    /// Initial lock bits
    pub lock: u8,
    /// RDY/BSY polls that read busy after each commit
    pub busy_polls: u32,
    /// Keep RDY/BSY low forever and drop every commit
    pub never_ready: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            signature: 0x1E950F, // ATmega328P
            fuses: FuseSet::new(0x62, 0xD9, 0xFF),
            lock: 0xFF,
            busy_polls: 3,
            never_ready: false,
        }
    }
}

impl DummyConfig {
    /// A factory fresh part from the device table
    pub fn for_device(device: &DeviceDescriptor) -> Self {
        Self {
            signature: device.signature,
            fuses: device.default_fuse,
            ..Default::default()
        }
    }
}

/// One write pulse that reached the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    /// Latched command
    pub command: u8,
    /// Register addressed by the byte selects, if any
    pub location: Option<FuseLocation>,
    /// Latched data byte
    pub value: u8,
}

/// Simulated AVR in a high-voltage programming socket
pub struct DummyAvr {
    config: DummyConfig,
    fuses: FuseSet,
    lock: u8,
    directions: [Option<Direction>; SIGNAL_COUNT],
    levels: [Level; SIGNAL_COUNT],
    command: Option<u8>,
    address: u8,
    data: u8,
    busy: u32,
    strobes: usize,
    commits: Vec<Commit>,
    violations: usize,
    elapsed_us: u64,
}

impl DummyAvr {
    /// Create a new dummy target with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            fuses: config.fuses,
            lock: config.lock,
            config,
            directions: [None; SIGNAL_COUNT],
            levels: [Level::Low; SIGNAL_COUNT],
            command: None,
            address: 0,
            data: 0,
            busy: 0,
            strobes: 0,
            commits: Vec::new(),
            violations: 0,
            elapsed_us: 0,
        }
    }

    /// Create a new dummy target with default configuration (ATmega328P)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Current fuse bytes
    pub fn fuses(&self) -> FuseSet {
        self.fuses
    }

    /// Current lock bits
    pub fn lock(&self) -> u8 {
        self.lock
    }

    /// Overwrite the fuse bytes
    pub fn set_fuses(&mut self, fuses: FuseSet) {
        self.fuses = fuses;
    }

    /// Overwrite the lock bits
    pub fn set_lock(&mut self, lock: u8) {
        self.lock = lock;
    }

    /// Make RDY/BSY stay low from now on
    pub fn set_never_ready(&mut self, never_ready: bool) {
        self.config.never_ready = never_ready;
    }

    /// WR pulses seen while powered
    pub fn strobes(&self) -> usize {
        self.strobes
    }

    /// Commits applied to the registers, oldest first
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Levels written to non-outputs plus samples of non-inputs
    pub fn violations(&self) -> usize {
        self.violations
    }

    /// Simulated time spent in delays
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    /// Returns true if both supplies are off and no protocol line is driven
    pub fn is_idle(&self) -> bool {
        let unpowered = Signal::POWER
            .iter()
            .all(|s| self.levels[s.index()] == Level::Low);
        unpowered
            && Signal::PROTOCOL
                .iter()
                .all(|s| self.directions[s.index()] != Some(Direction::Output))
    }

    fn line(&self, signal: Signal) -> Level {
        self.levels[signal.index()]
    }

    fn powered(&self) -> bool {
        self.line(Signal::VccEnable).is_high() && self.line(Signal::HvEnable).is_high()
    }

    fn bus(&self) -> u8 {
        Signal::DATA
            .iter()
            .enumerate()
            .fold(0u8, |acc, (bit, s)| {
                acc | (u8::from(self.line(*s).is_high()) << bit)
            })
    }

    fn apply(&mut self, signal: Signal, level: Level) {
        let old = core::mem::replace(&mut self.levels[signal.index()], level);
        if signal == Signal::VccEnable && level == Level::Low {
            // Power loss clears the command register
            self.command = None;
            self.busy = 0;
        }
        if !self.powered() {
            return;
        }
        match (signal, old, level) {
            (Signal::Xtal1, Level::Low, Level::High) => self.latch(),
            (Signal::Wr, Level::High, Level::Low) => self.commit(),
            _ => {}
        }
    }

    fn latch(&mut self) {
        let byte = self.bus();
        match (self.line(Signal::Xa1), self.line(Signal::Xa0)) {
            (Level::High, Level::Low) => {
                log::trace!("dummy: command 0x{:02X}", byte);
                self.command = Some(byte);
            }
            (Level::Low, Level::Low) => self.address = byte,
            (Level::Low, Level::High) => self.data = byte,
            (Level::High, Level::High) => {}
        }
    }

    fn write_location(&self) -> Option<FuseLocation> {
        match (self.line(Signal::Bs1), self.line(Signal::Bs2)) {
            (Level::Low, Level::Low) => Some(FuseLocation::Low),
            (Level::High, Level::Low) => Some(FuseLocation::High),
            (Level::Low, Level::High) => Some(FuseLocation::Extended),
            (Level::High, Level::High) => None,
        }
    }

    fn read_location(&self) -> FuseLocation {
        match (self.line(Signal::Bs1), self.line(Signal::Bs2)) {
            (Level::Low, Level::Low) => FuseLocation::Low,
            (Level::High, Level::High) => FuseLocation::High,
            (Level::Low, Level::High) => FuseLocation::Extended,
            (Level::High, Level::Low) => FuseLocation::Lock,
        }
    }

    fn commit(&mut self) {
        self.strobes += 1;
        let Some(command) = self.command else {
            log::debug!("dummy: WR pulse without a command");
            return;
        };
        if self.config.never_ready {
            log::debug!("dummy: dropping command 0x{:02X}, never ready", command);
            return;
        }

        let location = match command {
            opcodes::WRITE_FUSE => {
                let location = self.write_location();
                match location {
                    Some(_) if is_lock_mode_3(self.lock) => {
                        log::debug!("dummy: fuses locked, ignoring write");
                    }
                    Some(FuseLocation::Low) => self.fuses.low = self.data,
                    Some(FuseLocation::High) => self.fuses.high = self.data,
                    Some(FuseLocation::Extended) => self.fuses.extended = self.data,
                    _ => {}
                }
                location
            }
            opcodes::WRITE_LOCK => {
                // Lock bits can only be programmed; erase clears them
                self.lock &= self.data;
                Some(FuseLocation::Lock)
            }
            opcodes::CHIP_ERASE => {
                self.lock = 0xFF;
                None
            }
            _ => {
                log::debug!("dummy: WR pulse for non-write command 0x{:02X}", command);
                return;
            }
        };

        self.commits.push(Commit {
            command,
            location,
            value: self.data,
        });
        self.busy = self.config.busy_polls;
    }

    fn output(&self) -> u8 {
        if !self.powered() || self.line(Signal::Oe).is_high() {
            return 0;
        }
        match self.command {
            Some(opcodes::READ_SIGNATURE) => match self.address {
                0..=2 => (self.config.signature >> (8 * (2 - self.address))) as u8,
                _ => 0,
            },
            Some(opcodes::READ_FUSE_LOCK) => match self.read_location() {
                FuseLocation::Lock => self.lock,
                location => self.fuses.get(location).unwrap_or(0),
            },
            _ => 0,
        }
    }

    fn ready(&mut self) -> Level {
        if self.config.never_ready {
            return Level::Low;
        }
        if self.busy > 0 {
            self.busy -= 1;
            return Level::Low;
        }
        Level::High
    }
}

impl ParallelPins for DummyAvr {
    fn configure_output(&mut self, signal: Signal, level: Level) {
        self.directions[signal.index()] = Some(Direction::Output);
        self.apply(signal, level);
    }

    fn configure_input(&mut self, signal: Signal) {
        self.directions[signal.index()] = Some(Direction::Input);
    }

    fn set_level(&mut self, signal: Signal, level: Level) {
        if self.directions[signal.index()] != Some(Direction::Output) {
            log::warn!("dummy: {} driven while not an output", signal.name());
            self.violations += 1;
        }
        self.apply(signal, level);
    }

    fn level(&mut self, signal: Signal) -> Level {
        if self.directions[signal.index()] != Some(Direction::Input) {
            log::warn!("dummy: {} sampled while not an input", signal.name());
            self.violations += 1;
        }
        if signal == Signal::RdyBsy {
            return self.ready();
        }
        match Signal::DATA.iter().position(|s| *s == signal) {
            Some(bit) => Level::from(self.output() & (1 << bit) != 0),
            None => self.line(signal),
        }
    }

    fn delay_us(&mut self, us: u32) {
        // No delay needed for simulated time
        self.elapsed_us += u64::from(us);
    }
}
