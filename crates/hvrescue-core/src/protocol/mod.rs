//! High-voltage parallel programming protocol
//!
//! This module implements the byte framing of the AVR parallel programming
//! interface on top of [`SignalController`](crate::programmer::SignalController):
//! power sequencing, command/address/data loads, bus reads and the guarded
//! write strobe.

mod hvpp;
pub mod opcodes;

pub use hvpp::*;
