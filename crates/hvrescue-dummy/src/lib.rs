//! hvrescue-dummy - Simulated AVR target for testing
//!
//! This crate provides a dummy parallel programmer that behaves like an AVR
//! chip sitting in a high-voltage programming socket. It decodes the line
//! activity produced by the engine (XTAL1 latches, WR commits, OE reads),
//! keeps fuse and lock registers in memory and can be told to stay busy for
//! a while, or forever, after each write.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

mod monitor;
#[cfg(feature = "alloc")]
mod options;
#[cfg(feature = "alloc")]
mod target;

pub use monitor::PollTimeout;
#[cfg(feature = "alloc")]
pub use options::parse_options;
#[cfg(feature = "alloc")]
pub use target::{Commit, DummyAvr, DummyConfig};

#[cfg(all(test, feature = "std"))]
mod tests;
