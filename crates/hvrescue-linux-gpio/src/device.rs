//! Linux GPIO parallel programmer implementation
//!
//! This module provides the `LinuxGpioPins` struct that implements the
//! `ParallelPins` trait using Linux's GPIO character device interface
//! (gpiocdev). All 18 lines are held in one request; direction changes
//! reconfigure the request.

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use hvrescue_core::programmer::{Level, ParallelPins, Signal, SIGNAL_COUNT};

/// Default GPIO chip
pub const DEFAULT_DEVICE: &str = "/dev/gpiochip0";

/// Default wiring on a Raspberry Pi 40-pin header (BCM numbering)
///
/// Indexed by [`Signal::index`].
pub const DEFAULT_OFFSETS: [Offset; SIGNAL_COUNT] = [
    4,  // d0
    17, // d1
    27, // d2
    22, // d3
    5,  // d4
    6,  // d5
    13, // d6
    19, // d7
    26, // wr
    21, // oe
    20, // bs1
    16, // bs2
    12, // xa0
    25, // xa1
    24, // xtal1
    23, // rdy
    18, // vcc
    15, // hv
];

/// Configuration for opening a Linux GPIO parallel programmer
#[derive(Debug, Clone)]
pub struct LinuxGpioConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// Line offset of every signal, indexed by [`Signal::index`]
    pub offsets: [Offset; SIGNAL_COUNT],
}

impl Default for LinuxGpioConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            offsets: DEFAULT_OFFSETS,
        }
    }
}

impl LinuxGpioConfig {
    /// Line offset bound to `signal`
    pub fn line(&self, signal: Signal) -> Offset {
        self.offsets[signal.index()]
    }

    /// Bind `signal` to `offset`
    pub fn with_line(mut self, signal: Signal, offset: Offset) -> Self {
        self.offsets[signal.index()] = offset;
        self
    }

    /// Check that no two signals share a line
    pub fn validate(&self) -> Result<()> {
        if self.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        for (i, first) in Signal::ALL.iter().enumerate() {
            for second in &Signal::ALL[i + 1..] {
                if self.line(*first) == self.line(*second) {
                    return Err(LinuxGpioError::DuplicateLine {
                        first: first.name(),
                        second: second.name(),
                        offset: self.line(*first),
                    });
                }
            }
        }
        Ok(())
    }
}

fn value(level: Level) -> Value {
    match level {
        Level::High => Value::Active,
        Level::Low => Value::Inactive,
    }
}

/// Linux GPIO parallel programmer
///
/// Power switches start as outputs driven low, every other line as input.
pub struct LinuxGpioPins {
    /// GPIO line request handle
    request: Request,
    /// Full line configuration, updated on every direction change
    config: Config,
    /// GPIO line offsets indexed by signal
    offsets: [Offset; SIGNAL_COUNT],
}

impl LinuxGpioPins {
    /// Open the GPIO chip and request every line
    pub fn open(config: &LinuxGpioConfig) -> Result<Self> {
        config.validate()?;

        log::debug!("linux_gpio: Opening device {}", config.device);

        let mut req_config = Config::default();
        for signal in Signal::ALL {
            let line = req_config.with_line(config.line(signal));
            if Signal::POWER.contains(&signal) {
                line.as_output(Value::Inactive);
            } else {
                line.as_input();
            }
        }

        let request = Request::from_config(req_config.clone())
            .on_chip(&config.device)
            .with_consumer("hvrescue")
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                path: config.device.clone(),
                source,
            })?;

        log::info!(
            "linux_gpio: Opened {} (vcc={}, hv={}, rdy={}, xtal1={})",
            config.device,
            config.line(Signal::VccEnable),
            config.line(Signal::HvEnable),
            config.line(Signal::RdyBsy),
            config.line(Signal::Xtal1),
        );

        Ok(Self {
            request,
            config: req_config,
            offsets: config.offsets,
        })
    }

    fn offset(&self, signal: Signal) -> Offset {
        self.offsets[signal.index()]
    }

    fn reconfigure(&mut self, signal: Signal) {
        if let Err(e) = self.request.reconfigure(&self.config) {
            log::error!("Failed to reconfigure {}: {}", signal.name(), e);
        }
    }
}

impl ParallelPins for LinuxGpioPins {
    fn configure_output(&mut self, signal: Signal, level: Level) {
        let offset = self.offset(signal);
        self.config.with_line(offset).as_output(value(level));
        self.reconfigure(signal);
    }

    fn configure_input(&mut self, signal: Signal) {
        let offset = self.offset(signal);
        self.config.with_line(offset).as_input();
        self.reconfigure(signal);
    }

    fn set_level(&mut self, signal: Signal, level: Level) {
        if let Err(e) = self.request.set_value(self.offset(signal), value(level)) {
            log::error!("Failed to set {}: {}", signal.name(), e);
        }
    }

    fn level(&mut self, signal: Signal) -> Level {
        match self.request.value(self.offset(signal)) {
            Ok(Value::Active) => Level::High,
            Ok(Value::Inactive) => Level::Low,
            Err(e) => {
                log::error!("Failed to get {}: {}", signal.name(), e);
                Level::Low
            }
        }
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

/// Parse programmer options from a list of key-value pairs
///
/// # Supported Options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (default `/dev/gpiochip0`)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `d0=N` .. `d7=N` - data bus line offsets
/// - `wr=N`, `oe=N`, `bs1=N`, `bs2=N`, `xa0=N`, `xa1=N`, `xtal1=N`, `rdy=N` -
///   control line offsets
/// - `vcc=N`, `hv=N` - supply switch line offsets
///
/// Lines not given keep their [`DEFAULT_OFFSETS`] binding.
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxGpioConfig, String> {
    let mut config = LinuxGpioConfig::default();
    let mut dev: Option<String> = None;
    let mut gpiochip: Option<u32> = None;

    for (key, value) in options {
        match *key {
            "dev" => dev = Some(value.to_string()),
            "gpiochip" => {
                gpiochip = Some(
                    value
                        .parse()
                        .map_err(|_| {
                            LinuxGpioError::InvalidParameter(format!("gpiochip={}", value))
                                .to_string()
                        })?,
                );
            }
            _ => match Signal::ALL.iter().find(|s| s.name() == *key) {
                Some(signal) => {
                    let offset = value.parse().map_err(|_| {
                        LinuxGpioError::InvalidLineNumber {
                            name: signal.name(),
                            value: value.to_string(),
                        }
                        .to_string()
                    })?;
                    config.offsets[signal.index()] = offset;
                }
                None => log::warn!("linux_gpio: Unknown option: {}={}", key, value),
            },
        }
    }

    match (dev, gpiochip) {
        (Some(_), Some(_)) => {
            return Err(LinuxGpioError::InvalidParameter(
                "specify either 'dev' or 'gpiochip', not both".to_string(),
            )
            .to_string());
        }
        (Some(dev), None) => config.device = dev,
        (None, Some(n)) => config.device = format!("/dev/gpiochip{}", n),
        (None, None) => {}
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}
