//! hvrescue-core - Core library for AVR high-voltage parallel fuse rescue
//!
//! This crate drives the high-voltage parallel programming (HVPP) interface
//! of an AVR microcontroller from a second controller, which is the only way
//! to recover a chip whose fuses disabled its clock source or serial
//! programming interface. It is `no_std` compatible so the same engine can
//! run on a microcontroller or on a Linux host with GPIO access.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`), adds a
//!   thread based [`timeout::ThreadTimeoutMonitor`]
//! - `alloc` - Enable `Box` forwarding for the pin trait
//!
//! # Example
//!
//! ```ignore
//! use hvrescue_core::device::FuseLocation;
//! use hvrescue_core::fuse::{check_verify, FuseEngine};
//!
//! fn rescue<P: ParallelPins, T: TimeoutMonitor>(pins: P, monitor: T) -> Result<()> {
//!     let mut engine = FuseEngine::new(pins, monitor);
//!     let report = engine.verify();
//!     if report.device.is_none() {
//!         return Err(Error::UnknownDevice);
//!     }
//!     let found = engine.write_fuse(FuseLocation::Low, 0x62)?;
//!     check_verify(FuseLocation::Low, 0x62, found)?;
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod console;
pub mod device;
pub mod error;
pub mod fuse;
pub mod programmer;
pub mod protocol;
pub mod timeout;

pub use error::{Error, Result};
