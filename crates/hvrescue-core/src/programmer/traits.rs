//! Pin-level trait definitions
//!
//! A high-voltage parallel programmer is nothing more than 18 GPIO lines
//! wired to the target socket. Backends only have to move those lines;
//! all protocol knowledge lives above [`ParallelPins`].

use bitflags::bitflags;

/// Logical programmer signals
///
/// The binding of each signal to a physical line is backend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Signal {
    /// Data bus bit 0
    Data0 = 0,
    /// Data bus bit 1
    Data1 = 1,
    /// Data bus bit 2
    Data2 = 2,
    /// Data bus bit 3
    Data3 = 3,
    /// Data bus bit 4
    Data4 = 4,
    /// Data bus bit 5
    Data5 = 5,
    /// Data bus bit 6
    Data6 = 6,
    /// Data bus bit 7
    Data7 = 7,
    /// Write strobe (active low)
    Wr = 8,
    /// Output enable (active low)
    Oe = 9,
    /// Byte select 1
    Bs1 = 10,
    /// Byte select 2
    Bs2 = 11,
    /// Mode select 0
    Xa0 = 12,
    /// Mode select 1
    Xa1 = 13,
    /// Clock input of the target, used to latch bytes
    Xtal1 = 14,
    /// Ready (high) / busy (low) output of the target
    RdyBsy = 15,
    /// Switches the target logic supply
    VccEnable = 16,
    /// Switches +12V onto the target reset pin
    HvEnable = 17,
}

/// Number of logical signals
pub const SIGNAL_COUNT: usize = 18;

impl Signal {
    /// Data bus lines, bit 0 first
    pub const DATA: [Signal; 8] = [
        Self::Data0,
        Self::Data1,
        Self::Data2,
        Self::Data3,
        Self::Data4,
        Self::Data5,
        Self::Data6,
        Self::Data7,
    ];

    /// Every line that takes part in the protocol (all but the power switches)
    pub const PROTOCOL: [Signal; 16] = [
        Self::RdyBsy,
        Self::Oe,
        Self::Wr,
        Self::Bs1,
        Self::Bs2,
        Self::Xa0,
        Self::Xa1,
        Self::Xtal1,
        Self::Data0,
        Self::Data1,
        Self::Data2,
        Self::Data3,
        Self::Data4,
        Self::Data5,
        Self::Data6,
        Self::Data7,
    ];

    /// Power sequencing lines
    pub const POWER: [Signal; 2] = [Self::VccEnable, Self::HvEnable];

    /// All signals in index order
    pub const ALL: [Signal; SIGNAL_COUNT] = [
        Self::Data0,
        Self::Data1,
        Self::Data2,
        Self::Data3,
        Self::Data4,
        Self::Data5,
        Self::Data6,
        Self::Data7,
        Self::Wr,
        Self::Oe,
        Self::Bs1,
        Self::Bs2,
        Self::Xa0,
        Self::Xa1,
        Self::Xtal1,
        Self::RdyBsy,
        Self::VccEnable,
        Self::HvEnable,
    ];

    /// Index of this signal, stable across backends
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Data line carrying bit `bit` of a byte
    ///
    /// `bit` is taken modulo 8.
    pub const fn data(bit: usize) -> Signal {
        Self::DATA[bit & 7]
    }

    /// Short option name used in programmer strings
    pub const fn name(self) -> &'static str {
        match self {
            Self::Data0 => "d0",
            Self::Data1 => "d1",
            Self::Data2 => "d2",
            Self::Data3 => "d3",
            Self::Data4 => "d4",
            Self::Data5 => "d5",
            Self::Data6 => "d6",
            Self::Data7 => "d7",
            Self::Wr => "wr",
            Self::Oe => "oe",
            Self::Bs1 => "bs1",
            Self::Bs2 => "bs2",
            Self::Xa0 => "xa0",
            Self::Xa1 => "xa1",
            Self::Xtal1 => "xtal1",
            Self::RdyBsy => "rdy",
            Self::VccEnable => "vcc",
            Self::HvEnable => "hv",
        }
    }

    /// Single-bit set containing this signal
    pub const fn mask(self) -> SignalSet {
        SignalSet::from_bits_truncate(1 << self as u32)
    }
}

bitflags! {
    /// A set of logical signals, one bit per [`Signal`] index
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SignalSet: u32 {
        /// Data bus bit 0
        const DATA0 = 1 << 0;
        /// Data bus bit 1
        const DATA1 = 1 << 1;
        /// Data bus bit 2
        const DATA2 = 1 << 2;
        /// Data bus bit 3
        const DATA3 = 1 << 3;
        /// Data bus bit 4
        const DATA4 = 1 << 4;
        /// Data bus bit 5
        const DATA5 = 1 << 5;
        /// Data bus bit 6
        const DATA6 = 1 << 6;
        /// Data bus bit 7
        const DATA7 = 1 << 7;
        /// Write strobe
        const WR = 1 << 8;
        /// Output enable
        const OE = 1 << 9;
        /// Byte select 1
        const BS1 = 1 << 10;
        /// Byte select 2
        const BS2 = 1 << 11;
        /// Mode select 0
        const XA0 = 1 << 12;
        /// Mode select 1
        const XA1 = 1 << 13;
        /// Target clock
        const XTAL1 = 1 << 14;
        /// Ready/busy
        const RDY_BSY = 1 << 15;
        /// Logic supply enable
        const VCC_ENABLE = 1 << 16;
        /// High-voltage enable
        const HV_ENABLE = 1 << 17;

        /// The whole data bus
        const DATA = 0xFF;
        /// Every protocol line
        const PROTOCOL = 0xFFFF;
        /// Both power switches
        const POWER = Self::VCC_ENABLE.bits() | Self::HV_ENABLE.bits();
    }
}

/// Logic level of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    /// Logic 0
    #[default]
    Low,
    /// Logic 1
    High,
}

impl Level {
    /// Returns true for [`Level::High`]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> bool {
        level.is_high()
    }
}

/// Configured direction of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// High impedance, may be sampled
    Input,
    /// Driven by the programmer
    Output,
}

/// Trait for the GPIO lines of a parallel programmer
///
/// This trait provides the minimal set of operations needed to bitbang the
/// parallel programming interface. Implementations report backend failures
/// through `log` and carry on, as a half-applied GPIO change cannot be
/// rolled back anyway.
///
/// Callers must configure a line's direction before touching its level.
/// [`SignalController`](super::SignalController) guarantees this.
pub trait ParallelPins {
    /// Make `signal` an output, driving `level`
    fn configure_output(&mut self, signal: Signal, level: Level);

    /// Make `signal` a non-driving input
    fn configure_input(&mut self, signal: Signal);

    /// Drive a line already configured as output
    fn set_level(&mut self, signal: Signal, level: Level);

    /// Sample a line already configured as input
    fn level(&mut self, signal: Signal) -> Level;

    /// Delay for the specified number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Delay for the specified number of milliseconds
    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

impl<P: ParallelPins + ?Sized> ParallelPins for &mut P {
    fn configure_output(&mut self, signal: Signal, level: Level) {
        (**self).configure_output(signal, level)
    }

    fn configure_input(&mut self, signal: Signal) {
        (**self).configure_input(signal)
    }

    fn set_level(&mut self, signal: Signal, level: Level) {
        (**self).set_level(signal, level)
    }

    fn level(&mut self, signal: Signal) -> Level {
        (**self).level(signal)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

#[cfg(feature = "alloc")]
impl<P: ParallelPins + ?Sized> ParallelPins for alloc::boxed::Box<P> {
    fn configure_output(&mut self, signal: Signal, level: Level) {
        (**self).configure_output(signal, level)
    }

    fn configure_input(&mut self, signal: Signal) {
        (**self).configure_input(signal)
    }

    fn set_level(&mut self, signal: Signal, level: Level) {
        (**self).set_level(signal, level)
    }

    fn level(&mut self, signal: Signal) -> Level {
        (**self).level(signal)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
