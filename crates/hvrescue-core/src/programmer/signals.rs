//! Line state ownership
//!
//! [`SignalController`] is the only thing that touches a [`ParallelPins`]
//! backend. It remembers the direction of every line so that a level is
//! never written to, or read from, a line whose direction is not set up for
//! it: `drive` turns a line into an output first, `sample` turns it into an
//! input first.

use super::traits::{Direction, Level, ParallelPins, Signal, SignalSet, SIGNAL_COUNT};

/// Owns the idle/active configuration of every programmer line
pub struct SignalController<P: ParallelPins> {
    pins: P,
    directions: [Option<Direction>; SIGNAL_COUNT],
    levels: [Level; SIGNAL_COUNT],
}

impl<P: ParallelPins> SignalController<P> {
    /// Take ownership of the backend and put every line into its idle state
    pub fn new(pins: P) -> Self {
        let mut ctl = Self {
            pins,
            directions: [None; SIGNAL_COUNT],
            levels: [Level::Low; SIGNAL_COUNT],
        };
        ctl.quiesce();
        ctl
    }

    /// Drop both power switches and release every protocol line
    pub fn quiesce(&mut self) {
        for signal in Signal::POWER {
            self.drive(signal, Level::Low);
        }
        for signal in Signal::PROTOCOL {
            self.release(signal);
        }
        log::trace!("hvpp: lines quiesced");
    }

    /// Put the control lines into the state required before power-up
    ///
    /// WR and OE inactive high, mode and byte selects low, XTAL1 low, and
    /// RDY/BSY held low until the target takes it over.
    pub fn arm(&mut self) {
        self.output(Signal::Wr, Level::High);
        self.output(Signal::Oe, Level::High);
        self.output(Signal::Xa1, Level::Low);
        self.output(Signal::Xa0, Level::Low);
        self.output(Signal::Bs1, Level::Low);
        self.output(Signal::Bs2, Level::Low);
        self.output(Signal::Xtal1, Level::Low);
        self.output(Signal::RdyBsy, Level::Low);
        log::trace!("hvpp: lines armed");
    }

    /// Configure `signal` as an output driving `level`, unconditionally
    pub fn output(&mut self, signal: Signal, level: Level) {
        self.pins.configure_output(signal, level);
        self.directions[signal.index()] = Some(Direction::Output);
        self.levels[signal.index()] = level;
    }

    /// Configure `signal` as a non-driving input, unconditionally
    pub fn release(&mut self, signal: Signal) {
        self.pins.configure_input(signal);
        self.directions[signal.index()] = Some(Direction::Input);
    }

    /// Drive `signal` to `level`, making it an output first if necessary
    pub fn drive(&mut self, signal: Signal, level: Level) {
        if self.directions[signal.index()] == Some(Direction::Output) {
            self.pins.set_level(signal, level);
            self.levels[signal.index()] = level;
        } else {
            self.output(signal, level);
        }
    }

    /// Sample `signal`, making it an input first if necessary
    pub fn sample(&mut self, signal: Signal) -> Level {
        if self.directions[signal.index()] != Some(Direction::Input) {
            self.release(signal);
        }
        self.pins.level(signal)
    }

    /// Direction last configured for `signal`, `None` if never configured
    pub fn direction(&self, signal: Signal) -> Option<Direction> {
        self.directions[signal.index()]
    }

    /// Lines currently configured as outputs
    pub fn driven(&self) -> SignalSet {
        Signal::ALL
            .iter()
            .filter(|s| self.directions[s.index()] == Some(Direction::Output))
            .fold(SignalSet::empty(), |acc, s| acc | s.mask())
    }

    /// Returns true if both power switches are low and no protocol line is driven
    pub fn is_quiescent(&self) -> bool {
        let power_low = Signal::POWER
            .iter()
            .all(|s| self.levels[s.index()] == Level::Low);
        power_low && !self.driven().intersects(SignalSet::PROTOCOL)
    }

    /// Delay for the specified number of microseconds
    pub fn delay_us(&mut self, us: u32) {
        self.pins.delay_us(us);
    }

    /// Delay for the specified number of milliseconds
    pub fn delay_ms(&mut self, ms: u32) {
        self.pins.delay_ms(ms);
    }

    /// Borrow the backend
    pub fn pins(&self) -> &P {
        &self.pins
    }

    /// Mutably borrow the backend
    ///
    /// Line state changed through this handle is not tracked.
    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }

    /// Quiesce the lines and give the backend back
    pub fn into_inner(mut self) -> P {
        self.quiesce();
        self.pins
    }
}
