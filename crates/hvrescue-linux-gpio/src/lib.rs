//! hvrescue-linux-gpio - Linux GPIO backend for high-voltage parallel programming
//!
//! This crate drives the 18 lines of a high-voltage parallel programmer
//! from a Linux host using the GPIO character device interface (gpiocdev).
//! The +12V and VCC switches are expected to be transistor stages driven by
//! the `hv` and `vcc` lines; every other line connects to the target socket
//! through level shifters if the host runs at 3.3V.
//!
//! # Usage with hvrescue CLI
//!
//! ```bash
//! # Default Raspberry Pi wiring
//! hvrescue -p linux_gpio verify
//!
//! # Custom chip and a few moved lines
//! hvrescue -p linux_gpio:gpiochip=1,xtal1=2,rdy=3 console
//! ```
//!
//! # Default wiring (BCM numbering)
//!
//! | Signal | Line | Signal | Line |
//! |--------|------|--------|------|
//! | d0     | 4    | wr     | 26   |
//! | d1     | 17   | oe     | 21   |
//! | d2     | 27   | bs1    | 20   |
//! | d3     | 22   | bs2    | 16   |
//! | d4     | 5    | xa0    | 12   |
//! | d5     | 6    | xa1    | 25   |
//! | d6     | 13   | xtal1  | 24   |
//! | d7     | 19   | rdy    | 23   |
//! | vcc    | 18   | hv     | 15   |
//!
//! # System Requirements
//!
//! - Linux kernel 4.8+ with GPIO character device support (kernel 5.5+ for v2 API)
//! - Access to `/dev/gpiochipN` devices (may require root or udev rules)

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, LinuxGpioConfig, LinuxGpioPins, DEFAULT_OFFSETS};
pub use error::{LinuxGpioError, Result};

/// Open a Linux GPIO programmer and return a boxed ParallelPins
///
/// This is a convenience function for use in the CLI programmer dispatch.
pub fn open_linux_gpio(
    options: &[(&str, &str)],
) -> std::result::Result<
    Box<dyn hvrescue_core::programmer::ParallelPins>,
    Box<dyn std::error::Error>,
> {
    let config = parse_options(options)?;
    let pins = LinuxGpioPins::open(&config)?;
    Ok(Box::new(pins))
}
