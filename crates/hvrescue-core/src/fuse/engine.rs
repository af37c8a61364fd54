//! Device-aware fuse engine

use core::fmt;

use crate::device::{DeviceDescriptor, DeviceRegistry, FuseLocation, FuseSet, FuseSnapshot};
use crate::error::{Error, Result};
use crate::programmer::{Level, ParallelPins, SignalController};
use crate::protocol::opcodes::{
    CHIP_ERASE, MAX_RETRIES, POST_WRITE_DELAY_MS, PRE_WRITE_DELAY_MS, READ_FUSE_LOCK,
    READ_SIGNATURE, WRITE_FUSE, WRITE_LOCK,
};
use crate::protocol::Sequencer;
use crate::timeout::TimeoutMonitor;

use super::select::{read_select, write_select};

/// Engine state with respect to the connected target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Lines released, nothing known about the target
    Idle,
    /// Waiting for the first identification
    AwaitingDeviceId,
    /// The signature matched a registry entry
    DeviceKnown,
    /// The signature matched nothing; only identification is allowed
    DeviceUnknown,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingDeviceId => write!(f, "awaiting device id"),
            Self::DeviceKnown => write!(f, "device known"),
            Self::DeviceUnknown => write!(f, "device unknown"),
        }
    }
}

/// Attempt counter and timeout flag of the last write or erase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Write strobes issued
    pub attempts: u8,
    /// The last strobe hit the RDY/BSY deadline
    pub timed_out: bool,
}

impl RetryState {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Result of a device verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceReport {
    /// Signature as read, byte 0 most significant
    pub signature: u32,
    /// Matching registry entry
    pub device: Option<&'static DeviceDescriptor>,
    /// Current fuses and lock bits, read only for a known device
    pub fuses: Option<FuseSnapshot>,
}

/// Map a write read-back to [`Error::VerifyMismatch`] if it differs from the request
pub fn check_verify(location: FuseLocation, expected: u8, found: u8) -> Result<u8> {
    if found == expected {
        Ok(found)
    } else {
        Err(Error::VerifyMismatch {
            location,
            expected,
            found,
        })
    }
}

/// Fuse, lock and erase operations against one target
///
/// Owns the line controller, the write timeout monitor and the selected
/// device. Every modifying operation requires [`EngineState::DeviceKnown`]
/// and leaves the state unchanged; [`identify`](Self::identify) and
/// [`verify`](Self::verify) may run from any state.
pub struct FuseEngine<P: ParallelPins, T: TimeoutMonitor> {
    sequencer: Sequencer<P>,
    monitor: T,
    registry: DeviceRegistry,
    state: EngineState,
    selected: Option<&'static DeviceDescriptor>,
    retry: RetryState,
}

impl<P: ParallelPins, T: TimeoutMonitor> FuseEngine<P, T> {
    /// Create an engine using the built-in device table
    pub fn new(pins: P, monitor: T) -> Self {
        Self::with_registry(pins, monitor, DeviceRegistry::builtin())
    }

    /// Create an engine with a custom device table
    pub fn with_registry(pins: P, monitor: T, registry: DeviceRegistry) -> Self {
        Self {
            sequencer: Sequencer::new(pins),
            monitor,
            registry,
            state: EngineState::AwaitingDeviceId,
            selected: None,
            retry: RetryState::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Device selected by the last identification
    pub fn device(&self) -> Option<&'static DeviceDescriptor> {
        self.selected
    }

    /// Device table used for identification
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Returns true if the last write or erase ended on a timeout
    pub fn timed_out(&self) -> bool {
        self.retry.timed_out
    }

    /// Counters of the last write or erase
    pub fn retry_state(&self) -> RetryState {
        self.retry
    }

    /// Borrow the line controller
    pub fn signals(&self) -> &SignalController<P> {
        self.sequencer.signals()
    }

    /// Read the signature and select the matching registry entry
    pub fn identify(&mut self) -> (u32, Option<&'static DeviceDescriptor>) {
        let signature = {
            let mut session = self.sequencer.session();
            session.load_command(READ_SIGNATURE);
            (0u8..3).fold(0u32, |acc, address| {
                session.load_address_low(address);
                (acc << 8) | u32::from(session.receive_byte())
            })
        };

        self.selected = self.registry.find(signature);
        match self.selected {
            Some(device) => {
                self.state = EngineState::DeviceKnown;
                log::info!("Found {} (signature 0x{:06X})", device.name, signature);
            }
            None => {
                self.state = EngineState::DeviceUnknown;
                log::info!("Unknown device (signature 0x{:06X})", signature);
            }
        }
        (signature, self.selected)
    }

    /// Identify the target and, if known, read its configuration registers
    pub fn verify(&mut self) -> DeviceReport {
        let (signature, device) = self.identify();
        let fuses = device.map(|_| self.snapshot());
        DeviceReport {
            signature,
            device,
            fuses,
        }
    }

    /// Read one fuse byte or the lock bits
    pub fn read_fuse(&mut self, location: FuseLocation) -> Result<u8> {
        self.require_device()?;
        Ok(self.read_location(location))
    }

    /// Read all three fuse bytes and the lock bits
    pub fn read_all(&mut self) -> Result<FuseSnapshot> {
        self.require_device()?;
        Ok(self.snapshot())
    }

    /// Write one register and return its read-back value
    ///
    /// Retries up to [`MAX_RETRIES`] times while the read-back differs from
    /// `value`. A read-back that still differs is returned as `Ok`; use
    /// [`check_verify`] to turn it into an error. [`FuseLocation::Lock`] is
    /// routed to [`write_lock`](Self::write_lock).
    pub fn write_fuse(&mut self, location: FuseLocation, value: u8) -> Result<u8> {
        self.require_device()?;
        self.write_location(location, value)
    }

    /// Write the lock bits and return their read-back value
    pub fn write_lock(&mut self, value: u8) -> Result<u8> {
        self.require_device()?;
        self.write_location(FuseLocation::Lock, value)
    }

    /// Write low, high and extended fuses from the selected device's table
    ///
    /// Stops at the first timeout or verify mismatch without touching the
    /// remaining bytes.
    pub fn write_fuse_defaults(&mut self, bootloader: bool) -> Result<FuseSet> {
        self.write_fuse_defaults_with(bootloader, |_, _| {})
    }

    /// Like [`write_fuse_defaults`](Self::write_fuse_defaults), calling
    /// `progress` with each byte just before it is written
    pub fn write_fuse_defaults_with<F>(
        &mut self,
        bootloader: bool,
        mut progress: F,
    ) -> Result<FuseSet>
    where
        F: FnMut(FuseLocation, u8),
    {
        let device = self.require_device()?;
        let fuses = device.fuses(bootloader);
        log::debug!(
            "Writing {} fuses {} for {}",
            if bootloader { "bootloader" } else { "default" },
            fuses,
            device.name
        );
        for (location, value) in fuses.iter() {
            progress(location, value);
            let found = self.write_location(location, value)?;
            check_verify(location, value, found)?;
        }
        Ok(fuses)
    }

    /// Erase flash, EEPROM and lock bits
    ///
    /// There is no read-back to verify an erase against, so the command is
    /// only repeated while the target fails to report ready, for at most
    /// [`MAX_RETRIES`] attempts in total.
    pub fn erase_device(&mut self) -> Result<()> {
        self.require_device()?;
        self.retry.reset();
        loop {
            self.sequencer.delay_ms(PRE_WRITE_DELAY_MS);
            let result = {
                let mut session = self.sequencer.session();
                session.load_command(CHIP_ERASE);
                session.strobe_write(&mut self.monitor)
            };
            self.retry.attempts += 1;
            self.retry.timed_out = result.is_err();

            match result {
                Ok(()) => {
                    log::debug!("Chip erase complete after {} attempt(s)", self.retry.attempts);
                    return Ok(());
                }
                Err(e) if self.retry.attempts >= MAX_RETRIES => {
                    log::warn!("Chip erase timed out after {} attempts", self.retry.attempts);
                    return Err(e);
                }
                Err(_) => log::warn!("Chip erase timed out, retrying"),
            }
        }
    }

    /// Release the lines and forget the selected device
    pub fn release(&mut self) {
        self.sequencer.exit_programming_mode();
        self.selected = None;
        self.state = EngineState::Idle;
    }

    /// Release the lines and return the backend and the monitor
    pub fn into_inner(self) -> (P, T) {
        (self.sequencer.into_inner(), self.monitor)
    }

    fn require_device(&self) -> Result<&'static DeviceDescriptor> {
        match (self.state, self.selected) {
            (EngineState::DeviceKnown, Some(device)) => Ok(device),
            _ => Err(Error::UnknownDevice),
        }
    }

    fn snapshot(&mut self) -> FuseSnapshot {
        FuseSnapshot {
            fuses: FuseSet::new(
                self.read_location(FuseLocation::Low),
                self.read_location(FuseLocation::High),
                self.read_location(FuseLocation::Extended),
            ),
            lock: self.read_location(FuseLocation::Lock),
        }
    }

    fn read_location(&mut self, location: FuseLocation) -> u8 {
        let select = read_select(location);
        let mut session = self.sequencer.session();
        session.load_command(READ_FUSE_LOCK);
        session.select_bytes(select.bs1, select.bs2);
        let value = session.receive_byte();
        log::debug!("Read {} = 0x{:02X}", location, value);
        value
    }

    fn write_location(&mut self, location: FuseLocation, value: u8) -> Result<u8> {
        let command = match location {
            FuseLocation::Lock => WRITE_LOCK,
            _ => WRITE_FUSE,
        };
        let select = write_select(location);
        self.retry.reset();

        let result = loop {
            self.sequencer.delay_ms(PRE_WRITE_DELAY_MS);
            let strobe = {
                let mut session = self.sequencer.session();
                session.load_command(command);
                session.load_data(value);
                session.select_bytes(select.bs1, select.bs2);
                let strobe = session.strobe_write(&mut self.monitor);
                session.select_bytes(Level::Low, Level::Low);
                strobe
            };
            self.retry.attempts += 1;

            if let Err(e) = strobe {
                self.retry.timed_out = true;
                log::warn!("Writing {} timed out", location);
                break Err(e);
            }

            let found = self.read_location(location);
            if found == value {
                log::debug!(
                    "Wrote {} = 0x{:02X} in {} attempt(s)",
                    location,
                    value,
                    self.retry.attempts
                );
                break Ok(found);
            }
            if self.retry.attempts > MAX_RETRIES {
                log::warn!(
                    "Writing {}: read back 0x{:02X} instead of 0x{:02X}",
                    location,
                    found,
                    value
                );
                break Ok(found);
            }
            log::debug!("Verify of {} failed (0x{:02X}), retrying", location, found);
        };

        self.sequencer.delay_ms(POST_WRITE_DELAY_MS);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programmer::Signal;

    /// Floating bus: every input reads low, RDY/BSY never goes high
    struct Floating;

    impl ParallelPins for Floating {
        fn configure_output(&mut self, _signal: Signal, _level: Level) {}
        fn configure_input(&mut self, _signal: Signal) {}
        fn set_level(&mut self, _signal: Signal, _level: Level) {}
        fn level(&mut self, _signal: Signal) -> Level {
            Level::Low
        }
        fn delay_us(&mut self, _us: u32) {}
    }

    struct Expired;

    impl TimeoutMonitor for Expired {
        fn arm(&mut self, _deadline_ms: u32) {}
        fn disarm(&mut self) {}
        fn timed_out(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_initial_state() {
        let engine = FuseEngine::new(Floating, Expired);
        assert_eq!(engine.state(), EngineState::AwaitingDeviceId);
        assert!(engine.device().is_none());
        assert!(!engine.timed_out());
    }

    #[test]
    fn test_operations_gated_before_identify() {
        let mut engine = FuseEngine::new(Floating, Expired);
        assert_eq!(engine.read_fuse(FuseLocation::Low), Err(Error::UnknownDevice));
        assert_eq!(engine.write_lock(0xFF), Err(Error::UnknownDevice));
        assert_eq!(engine.erase_device(), Err(Error::UnknownDevice));
    }

    #[test]
    fn test_floating_bus_is_unknown() {
        let mut engine = FuseEngine::new(Floating, Expired);
        let report = engine.verify();
        assert_eq!(report.signature, 0x000000);
        assert!(report.device.is_none());
        assert!(report.fuses.is_none());
        assert_eq!(engine.state(), EngineState::DeviceUnknown);
        assert_eq!(
            engine.write_fuse(FuseLocation::Low, 0x62),
            Err(Error::UnknownDevice)
        );
        assert_eq!(engine.retry_state().attempts, 0);
    }

    #[test]
    fn test_release_goes_idle() {
        let mut engine = FuseEngine::new(Floating, Expired);
        engine.verify();
        engine.release();
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.signals().is_quiescent());
    }

    #[test]
    fn test_check_verify() {
        assert_eq!(check_verify(FuseLocation::High, 0xD9, 0xD9), Ok(0xD9));
        assert_eq!(
            check_verify(FuseLocation::High, 0xD9, 0xDF),
            Err(Error::VerifyMismatch {
                location: FuseLocation::High,
                expected: 0xD9,
                found: 0xDF,
            })
        );
    }
}
