//! Byte framing and session handling

use core::ops::{Deref, DerefMut};

use crate::error::{Error, Result};
use crate::programmer::{Level, ParallelPins, Signal, SignalController};
use crate::timeout::TimeoutMonitor;

use super::opcodes::{
    CLOCK_HOLD_US, HV_SETTLE_US, PROGRAM_ENTRY_US, READ_SETTLE_MS, VCC_SETTLE_US,
    WRITE_SETTLE_US, WRITE_TIMEOUT_MS,
};

/// Which internal register the next latched byte goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Command register
    Command,
    /// Low address byte
    AddressLow,
    /// Low data byte
    Data,
}

impl LoadMode {
    /// Levels of (XA1, XA0, BS1) selecting this register
    pub const fn lines(self) -> (Level, Level, Level) {
        match self {
            Self::Command => (Level::High, Level::Low, Level::Low),
            Self::AddressLow => (Level::Low, Level::Low, Level::Low),
            Self::Data => (Level::Low, Level::High, Level::Low),
        }
    }
}

/// Byte framing on top of a [`SignalController`]
pub struct Sequencer<P: ParallelPins> {
    signals: SignalController<P>,
}

impl<P: ParallelPins> Sequencer<P> {
    /// Wrap a backend, leaving every line idle
    pub fn new(pins: P) -> Self {
        Self {
            signals: SignalController::new(pins),
        }
    }

    /// Power the target into parallel programming mode
    ///
    /// Precondition: no session is active. Prefer [`session`](Self::session),
    /// which also guarantees the matching exit.
    pub fn enter_programming_mode(&mut self) {
        self.signals.arm();
        self.signals.drive(Signal::VccEnable, Level::High);
        self.signals.delay_us(VCC_SETTLE_US);
        self.signals.drive(Signal::HvEnable, Level::High);
        self.signals.delay_us(HV_SETTLE_US);
        self.signals.release(Signal::RdyBsy);
        self.signals.delay_us(PROGRAM_ENTRY_US);
        log::trace!("hvpp: entered programming mode");
    }

    /// Remove power and release every line
    pub fn exit_programming_mode(&mut self) {
        self.signals.quiesce();
        log::trace!("hvpp: left programming mode");
    }

    /// Enter programming mode for the lifetime of the returned guard
    pub fn session(&mut self) -> ProgrammingSession<'_, P> {
        self.enter_programming_mode();
        ProgrammingSession { sequencer: self }
    }

    /// Select the register the next byte latches into
    pub fn set_load_mode(&mut self, mode: LoadMode) {
        let (xa1, xa0, bs1) = mode.lines();
        self.signals.drive(Signal::Xa1, xa1);
        self.signals.drive(Signal::Xa0, xa0);
        self.signals.drive(Signal::Bs1, bs1);
    }

    /// Latch a command byte
    pub fn load_command(&mut self, command: u8) {
        log::trace!("hvpp: command 0x{:02X}", command);
        self.set_load_mode(LoadMode::Command);
        self.transmit_byte(command);
    }

    /// Latch the low address byte
    pub fn load_address_low(&mut self, address: u8) {
        log::trace!("hvpp: address 0x{:02X}", address);
        self.set_load_mode(LoadMode::AddressLow);
        self.transmit_byte(address);
    }

    /// Latch the low data byte
    pub fn load_data(&mut self, data: u8) {
        log::trace!("hvpp: data 0x{:02X}", data);
        self.set_load_mode(LoadMode::Data);
        self.transmit_byte(data);
    }

    /// Put `byte` on the data bus (bit i on line i) and pulse XTAL1
    pub fn transmit_byte(&mut self, byte: u8) {
        for (bit, line) in Signal::DATA.iter().enumerate() {
            self.signals.drive(*line, Level::from(byte & (1 << bit) != 0));
        }
        self.signals.drive(Signal::Xtal1, Level::High);
        self.signals.delay_us(CLOCK_HOLD_US);
        self.signals.drive(Signal::Xtal1, Level::Low);
        self.signals.delay_us(CLOCK_HOLD_US);
    }

    /// Enable the target's output drivers and sample the data bus
    pub fn receive_byte(&mut self) -> u8 {
        self.signals.drive(Signal::Oe, Level::Low);
        let mut byte = 0u8;
        for bit in (0..8).rev() {
            byte <<= 1;
            if self.signals.sample(Signal::data(bit)).is_high() {
                byte |= 1;
            }
        }
        self.signals.drive(Signal::Oe, Level::High);
        self.signals.delay_ms(READ_SETTLE_MS);
        log::trace!("hvpp: read 0x{:02X}", byte);
        byte
    }

    /// Drive the byte-select pair
    pub fn select_bytes(&mut self, bs1: Level, bs2: Level) {
        self.signals.drive(Signal::Bs1, bs1);
        self.signals.drive(Signal::Bs2, bs2);
    }

    /// Pulse WR to commit the latched operation and wait for RDY/BSY
    ///
    /// The wait is bounded by `monitor`, armed for [`WRITE_TIMEOUT_MS`].
    /// Returns [`Error::WriteTimeout`] if the deadline fired before the
    /// target reported ready; the monitor is disarmed either way.
    pub fn strobe_write<T: TimeoutMonitor + ?Sized>(&mut self, monitor: &mut T) -> Result<()> {
        monitor.arm(WRITE_TIMEOUT_MS);
        self.signals.drive(Signal::Wr, Level::Low);
        self.signals.drive(Signal::Wr, Level::High);
        self.signals.delay_us(WRITE_SETTLE_US);

        let mut polls: u32 = 0;
        let result = loop {
            if self.signals.sample(Signal::RdyBsy).is_high() {
                break Ok(());
            }
            if monitor.timed_out() {
                break Err(Error::WriteTimeout);
            }
            polls = polls.wrapping_add(1);
        };
        monitor.disarm();

        match result {
            Ok(()) => log::trace!("hvpp: ready after {} polls", polls),
            Err(_) => log::debug!("hvpp: RDY/BSY still low after {} ms", WRITE_TIMEOUT_MS),
        }
        result
    }

    /// Pause for `ms` milliseconds
    pub fn delay_ms(&mut self, ms: u32) {
        self.signals.delay_ms(ms);
    }

    /// Borrow the line controller
    pub fn signals(&self) -> &SignalController<P> {
        &self.signals
    }

    /// Mutably borrow the line controller
    pub fn signals_mut(&mut self) -> &mut SignalController<P> {
        &mut self.signals
    }

    /// Quiesce the lines and give the backend back
    pub fn into_inner(self) -> P {
        self.signals.into_inner()
    }
}

/// Guard for an active programming session
///
/// Created by [`Sequencer::session`]. Holds the sequencer's only mutable
/// borrow, so two sessions can never overlap, and quiesces every line when
/// dropped on any exit path.
pub struct ProgrammingSession<'a, P: ParallelPins> {
    sequencer: &'a mut Sequencer<P>,
}

impl<P: ParallelPins> Deref for ProgrammingSession<'_, P> {
    type Target = Sequencer<P>;

    fn deref(&self) -> &Self::Target {
        self.sequencer
    }
}

impl<P: ParallelPins> DerefMut for ProgrammingSession<'_, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.sequencer
    }
}

impl<P: ParallelPins> Drop for ProgrammingSession<'_, P> {
    fn drop(&mut self) {
        self.sequencer.exit_programming_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programmer::{Direction, SIGNAL_COUNT};

    /// Bus model: outputs are remembered, inputs read back `bus`
    struct Bus {
        dir: [Option<Direction>; SIGNAL_COUNT],
        level: [Level; SIGNAL_COUNT],
        bus: u8,
        clock_edges: usize,
        latched: [u8; 4],
        latch_count: usize,
        ready_after: u32,
        delays_us: u64,
    }

    impl Bus {
        fn new() -> Self {
            Self {
                dir: [None; SIGNAL_COUNT],
                level: [Level::Low; SIGNAL_COUNT],
                bus: 0,
                clock_edges: 0,
                latched: [0; 4],
                latch_count: 0,
                ready_after: 0,
                delays_us: 0,
            }
        }

        fn data_out(&self) -> u8 {
            (0..8).fold(0u8, |acc, bit| {
                acc | ((self.level[Signal::data(bit).index()].is_high() as u8) << bit)
            })
        }
    }

    impl ParallelPins for Bus {
        fn configure_output(&mut self, signal: Signal, level: Level) {
            self.dir[signal.index()] = Some(Direction::Output);
            self.set_level(signal, level);
        }

        fn configure_input(&mut self, signal: Signal) {
            self.dir[signal.index()] = Some(Direction::Input);
        }

        fn set_level(&mut self, signal: Signal, level: Level) {
            let old = self.level[signal.index()];
            self.level[signal.index()] = level;
            if signal == Signal::Xtal1 && old == Level::Low && level == Level::High {
                self.clock_edges += 1;
                if self.latch_count < self.latched.len() {
                    self.latched[self.latch_count] = self.data_out();
                    self.latch_count += 1;
                }
            }
        }

        fn level(&mut self, signal: Signal) -> Level {
            if signal == Signal::RdyBsy {
                if self.ready_after == 0 {
                    return Level::High;
                }
                self.ready_after -= 1;
                return Level::Low;
            }
            match Signal::DATA.iter().position(|s| *s == signal) {
                Some(bit) => Level::from(self.bus & (1 << bit) != 0),
                None => Level::Low,
            }
        }

        fn delay_us(&mut self, us: u32) {
            self.delays_us += us as u64;
        }
    }

    struct NeverFires;

    impl TimeoutMonitor for NeverFires {
        fn arm(&mut self, _deadline_ms: u32) {}
        fn disarm(&mut self) {}
        fn timed_out(&self) -> bool {
            false
        }
    }

    struct AlwaysFires {
        armed: bool,
    }

    impl TimeoutMonitor for AlwaysFires {
        fn arm(&mut self, _deadline_ms: u32) {
            self.armed = true;
        }
        fn disarm(&mut self) {
            self.armed = false;
        }
        fn timed_out(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_transmit_bit_order() {
        let mut seq = Sequencer::new(Bus::new());
        seq.transmit_byte(0xA5);
        let bus = seq.signals().pins();
        assert_eq!(bus.latched[0], 0xA5);
        assert_eq!(bus.level[Signal::Data0.index()], Level::High);
        assert_eq!(bus.level[Signal::Data1.index()], Level::Low);
        assert_eq!(bus.level[Signal::Data7.index()], Level::High);
        assert_eq!(bus.level[Signal::Xtal1.index()], Level::Low);
    }

    #[test]
    fn test_receive_bit_order() {
        let mut seq = Sequencer::new(Bus::new());
        seq.signals_mut().pins_mut().bus = 0x1E;
        assert_eq!(seq.receive_byte(), 0x1E);
        assert_eq!(seq.signals().pins().level[Signal::Oe.index()], Level::High);
        seq.signals_mut().pins_mut().bus = 0x80;
        assert_eq!(seq.receive_byte(), 0x80);
    }

    #[test]
    fn test_load_modes() {
        let mut seq = Sequencer::new(Bus::new());
        seq.signals_mut().arm();
        seq.load_command(0x40);
        {
            let bus = seq.signals().pins();
            assert_eq!(bus.level[Signal::Xa1.index()], Level::High);
            assert_eq!(bus.level[Signal::Xa0.index()], Level::Low);
            assert_eq!(bus.level[Signal::Bs1.index()], Level::Low);
        }
        seq.load_data(0x62);
        {
            let bus = seq.signals().pins();
            assert_eq!(bus.level[Signal::Xa1.index()], Level::Low);
            assert_eq!(bus.level[Signal::Xa0.index()], Level::High);
        }
        seq.load_address_low(0x02);
        {
            let bus = seq.signals().pins();
            assert_eq!(bus.level[Signal::Xa1.index()], Level::Low);
            assert_eq!(bus.level[Signal::Xa0.index()], Level::Low);
            assert_eq!(&bus.latched[..3], &[0x40, 0x62, 0x02]);
        }
    }

    #[test]
    fn test_session_guard_quiesces() {
        let mut seq = Sequencer::new(Bus::new());
        {
            let mut session = seq.session();
            assert!(!session.signals().is_quiescent());
            assert_eq!(
                session.signals().direction(Signal::RdyBsy),
                Some(Direction::Input)
            );
            session.load_command(0x08);
        }
        assert!(seq.signals().is_quiescent());
        assert!(seq.signals().pins().delays_us >= 340);
    }

    #[test]
    fn test_strobe_ready() {
        let mut seq = Sequencer::new(Bus::new());
        seq.signals_mut().pins_mut().ready_after = 5;
        let mut session = seq.session();
        assert_eq!(session.strobe_write(&mut NeverFires), Ok(()));
        assert_eq!(session.signals().pins().ready_after, 0);
    }

    #[test]
    fn test_strobe_timeout() {
        let mut seq = Sequencer::new(Bus::new());
        seq.signals_mut().pins_mut().ready_after = u32::MAX;
        let mut monitor = AlwaysFires { armed: false };
        let mut session = seq.session();
        assert_eq!(
            session.strobe_write(&mut monitor),
            Err(Error::WriteTimeout)
        );
        assert!(!monitor.armed);
    }
}
