//! Engine and console behaviour against the simulated target

use std::time::{Duration, Instant};

use hvrescue_core::console::CommandConsole;
use hvrescue_core::device::{DeviceRegistry, FuseLocation, FuseSet, FuseSnapshot};
use hvrescue_core::fuse::{check_verify, EngineState, FuseEngine};
use hvrescue_core::protocol::opcodes;
use hvrescue_core::timeout::{ThreadTimeoutMonitor, TimeoutMonitor};
use hvrescue_core::Error;

use crate::{parse_options, DummyAvr, DummyConfig, PollTimeout};

fn engine(config: DummyConfig) -> FuseEngine<DummyAvr, PollTimeout> {
    FuseEngine::new(DummyAvr::new(config), PollTimeout::default())
}

fn identified(config: DummyConfig) -> FuseEngine<DummyAvr, PollTimeout> {
    let mut engine = engine(config);
    engine.identify();
    assert_eq!(engine.state(), EngineState::DeviceKnown);
    engine
}

fn assert_idle<T: TimeoutMonitor>(engine: &FuseEngine<DummyAvr, T>) {
    let signals = engine.signals();
    assert!(signals.is_quiescent());
    assert!(signals.pins().is_idle());
    assert_eq!(signals.pins().violations(), 0);
}

fn fuse_writes(target: &DummyAvr) -> Vec<(Option<FuseLocation>, u8)> {
    target
        .commits()
        .iter()
        .filter(|c| c.command == opcodes::WRITE_FUSE)
        .map(|c| (c.location, c.value))
        .collect()
}

#[test]
fn test_identify_atmega328p() {
    let mut engine = engine(DummyConfig::default());
    let (signature, device) = engine.identify();
    assert_eq!(signature, 0x1E950F);
    let device = device.unwrap();
    assert_eq!(device.name, "ATmega328P");
    assert_eq!(device.default_fuse, FuseSet::new(0x62, 0xD9, 0xFF));
    assert_eq!(device.bootloader_fuse, FuseSet::new(0xFF, 0xDE, 0x05));
    assert_eq!(engine.state(), EngineState::DeviceKnown);
    assert_idle(&engine);
}

#[test]
fn test_identify_every_registry_entry() {
    for expected in DeviceRegistry::builtin().iter() {
        let mut engine = engine(DummyConfig::for_device(expected));
        let (signature, device) = engine.identify();
        assert_eq!(signature, expected.signature);
        assert_eq!(device, Some(expected));
    }
}

#[test]
fn test_verify_reads_snapshot() {
    let config = DummyConfig {
        fuses: FuseSet::new(0xE2, 0xDF, 0xFD),
        lock: 0xFE,
        ..Default::default()
    };
    let mut engine = engine(config);
    let report = engine.verify();
    assert_eq!(report.signature, 0x1E950F);
    assert_eq!(
        report.fuses,
        Some(FuseSnapshot {
            fuses: FuseSet::new(0xE2, 0xDF, 0xFD),
            lock: 0xFE,
        })
    );
    assert_idle(&engine);
}

#[test]
fn test_read_is_idempotent() {
    let mut engine = identified(DummyConfig::default());
    for location in FuseLocation::FUSES {
        let first = engine.read_fuse(location).unwrap();
        let second = engine.read_fuse(location).unwrap();
        assert_eq!(first, second);
    }
    assert_eq!(engine.signals().pins().strobes(), 0);
}

#[test]
fn test_write_read_round_trip() {
    let mut engine = identified(DummyConfig::default());
    for location in FuseLocation::FUSES {
        for value in [0x00, 0x5A, 0xA5, 0xFF] {
            assert_eq!(engine.write_fuse(location, value), Ok(value));
            assert_eq!(engine.retry_state().attempts, 1);
            assert!(!engine.timed_out());
            assert_eq!(engine.read_fuse(location), Ok(value));
            assert_idle(&engine);
        }
    }
}

#[test]
fn test_write_goes_to_addressed_byte_only() {
    let mut engine = identified(DummyConfig::default());
    engine.write_fuse(FuseLocation::High, 0xDE).unwrap();
    assert_eq!(
        engine.signals().pins().fuses(),
        FuseSet::new(0x62, 0xDE, 0xFF)
    );
    engine.write_fuse(FuseLocation::Extended, 0x05).unwrap();
    assert_eq!(
        engine.signals().pins().fuses(),
        FuseSet::new(0x62, 0xDE, 0x05)
    );
}

#[test]
fn test_persistent_mismatch_retries_four_times() {
    let config = DummyConfig {
        lock: 0xFC,
        ..Default::default()
    };
    let mut engine = identified(config);
    let found = engine.write_fuse(FuseLocation::Low, 0xE2).unwrap();
    assert_eq!(found, 0x62);
    assert_eq!(engine.retry_state().attempts, 4);
    assert!(!engine.timed_out());
    assert_eq!(engine.signals().pins().strobes(), 4);
    assert_eq!(
        check_verify(FuseLocation::Low, 0xE2, found),
        Err(Error::VerifyMismatch {
            location: FuseLocation::Low,
            expected: 0xE2,
            found: 0x62,
        })
    );
    assert_idle(&engine);
}

#[test]
fn test_defaults_written_in_order() {
    let config = DummyConfig {
        fuses: FuseSet::new(0xFF, 0xFF, 0xFF),
        ..Default::default()
    };
    let mut engine = identified(config);
    assert_eq!(
        engine.write_fuse_defaults(false),
        Ok(FuseSet::new(0x62, 0xD9, 0xFF))
    );
    let (target, _) = engine.into_inner();
    assert_eq!(
        fuse_writes(&target),
        [
            (Some(FuseLocation::Low), 0x62),
            (Some(FuseLocation::High), 0xD9),
            (Some(FuseLocation::Extended), 0xFF),
        ]
    );
    assert_eq!(target.fuses(), FuseSet::new(0x62, 0xD9, 0xFF));
}

#[test]
fn test_defaults_progress_stops_with_failed_byte() {
    let config = DummyConfig {
        fuses: FuseSet::new(0x62, 0xDF, 0xFD),
        lock: 0xFC,
        ..Default::default()
    };
    let mut engine = identified(config);
    let mut seen = Vec::new();
    let result = engine.write_fuse_defaults_with(false, |location, value| {
        seen.push((location, value))
    });
    // Low already matches, high is locked at 0xDF
    assert_eq!(
        result,
        Err(Error::VerifyMismatch {
            location: FuseLocation::High,
            expected: 0xD9,
            found: 0xDF,
        })
    );
    assert_eq!(
        seen,
        [(FuseLocation::Low, 0x62), (FuseLocation::High, 0xD9)]
    );
    assert_idle(&engine);
}

#[test]
fn test_bootloader_defaults() {
    let mut engine = identified(DummyConfig::default());
    engine.write_fuse_defaults(true).unwrap();
    assert_eq!(
        engine.signals().pins().fuses(),
        FuseSet::new(0xFF, 0xDE, 0x05)
    );
    assert_idle(&engine);
}

#[test]
fn test_defaults_stop_at_mismatch() {
    let config = DummyConfig {
        fuses: FuseSet::new(0xE2, 0xDF, 0xFD),
        lock: 0xFC,
        ..Default::default()
    };
    let mut engine = identified(config);
    assert_eq!(
        engine.write_fuse_defaults(false),
        Err(Error::VerifyMismatch {
            location: FuseLocation::Low,
            expected: 0x62,
            found: 0xE2,
        })
    );
    // All four strobes were spent on the low byte
    assert_eq!(engine.signals().pins().strobes(), 4);
    assert_idle(&engine);
}

#[test]
fn test_defaults_stop_at_timeout() {
    let config = DummyConfig {
        never_ready: true,
        ..Default::default()
    };
    let mut engine = identified(config);
    assert_eq!(engine.write_fuse_defaults(false), Err(Error::WriteTimeout));
    assert!(engine.timed_out());
    assert_eq!(engine.signals().pins().strobes(), 1);
    assert_idle(&engine);
}

#[test]
fn test_unknown_signature_refuses_writes() {
    let config = DummyConfig {
        signature: 0x000000,
        ..Default::default()
    };
    let mut engine = engine(config);
    assert_eq!(engine.identify(), (0x000000, None));
    assert_eq!(engine.state(), EngineState::DeviceUnknown);
    assert_eq!(
        engine.write_fuse(FuseLocation::Low, 0xE2),
        Err(Error::UnknownDevice)
    );
    assert_eq!(engine.write_fuse_defaults(false), Err(Error::UnknownDevice));
    assert_eq!(engine.erase_device(), Err(Error::UnknownDevice));
    assert_eq!(engine.signals().pins().strobes(), 0);

    // Identification may always be retried
    let report = engine.verify();
    assert!(report.device.is_none());
    assert!(report.fuses.is_none());
}

#[test]
fn test_never_ready_times_out_in_bounded_time() {
    let config = DummyConfig {
        never_ready: true,
        ..Default::default()
    };
    let mut engine = FuseEngine::new(DummyAvr::new(config), ThreadTimeoutMonitor::new());
    engine.identify();

    let start = Instant::now();
    assert_eq!(
        engine.write_fuse(FuseLocation::Low, 0xE2),
        Err(Error::WriteTimeout)
    );
    assert!(start.elapsed() < Duration::from_millis(800));
    assert!(engine.timed_out());
    assert_eq!(engine.retry_state().attempts, 1);
    assert_idle(&engine);
}

#[test]
fn test_slow_target_within_deadline() {
    let config = DummyConfig {
        busy_polls: 500,
        ..Default::default()
    };
    let mut engine = identified(config);
    assert_eq!(engine.write_fuse(FuseLocation::High, 0xDE), Ok(0xDE));
    assert!(!engine.timed_out());
}

#[test]
fn test_slow_target_past_deadline() {
    let config = DummyConfig {
        busy_polls: 5000,
        ..Default::default()
    };
    let mut engine = FuseEngine::new(DummyAvr::new(config), PollTimeout::new(100));
    engine.identify();
    assert_eq!(
        engine.write_fuse(FuseLocation::High, 0xDE),
        Err(Error::WriteTimeout)
    );
    let (_, monitor) = engine.into_inner();
    assert!(!monitor.is_armed());
    assert_eq!(monitor.arms(), 1);
}

#[test]
fn test_write_lock() {
    let mut engine = identified(DummyConfig::default());
    assert_eq!(engine.write_lock(0xFE), Ok(0xFE));
    let commit = engine.signals().pins().commits()[0];
    assert_eq!(commit.command, opcodes::WRITE_LOCK);
    assert_eq!(commit.location, Some(FuseLocation::Lock));

    // Mode 3 locks the fuses against further changes
    assert_eq!(engine.write_lock(0xFC), Ok(0xFC));
    assert_eq!(engine.write_fuse(FuseLocation::Low, 0xE2), Ok(0x62));
    assert_idle(&engine);
}

#[test]
fn test_erase_clears_lock_bits() {
    let config = DummyConfig {
        lock: 0xFC,
        fuses: FuseSet::new(0xE2, 0xDF, 0xFD),
        ..Default::default()
    };
    let mut engine = identified(config);
    assert_eq!(engine.erase_device(), Ok(()));
    assert_eq!(engine.retry_state().attempts, 1);
    assert_eq!(engine.read_fuse(FuseLocation::Lock), Ok(0xFF));
    // Fuses survive a chip erase
    assert_eq!(engine.read_fuse(FuseLocation::Low), Ok(0xE2));
    assert_eq!(engine.write_fuse(FuseLocation::Low, 0x62), Ok(0x62));
    assert_idle(&engine);
}

#[test]
fn test_erase_retries_only_on_timeout() {
    let config = DummyConfig {
        never_ready: true,
        ..Default::default()
    };
    let mut engine = identified(config);
    assert_eq!(engine.erase_device(), Err(Error::WriteTimeout));
    assert!(engine.timed_out());
    assert_eq!(engine.retry_state().attempts, opcodes::MAX_RETRIES);
    assert_eq!(engine.signals().pins().strobes(), 3);
    assert_idle(&engine);
}

#[test]
fn test_release_forgets_device() {
    let mut engine = identified(DummyConfig::default());
    engine.release();
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.device().is_none());
    assert_eq!(engine.read_fuse(FuseLocation::Low), Err(Error::UnknownDevice));
    assert_idle(&engine);
}

#[test]
fn test_power_sequencing_delays() {
    let mut engine = engine(DummyConfig::default());
    engine.identify();
    // 30 + 10 + 300 us entry, then three reads of 1 ms each
    assert!(engine.signals().pins().elapsed_us() >= 340 + 3_000);
}

#[test]
fn test_parse_options() {
    let config = parse_options(&[("sig", "1E9307"), ("low", "0xE1"), ("lock", "fc")]).unwrap();
    assert_eq!(config.signature, 0x1E9307);
    assert_eq!(config.fuses.low, 0xE1);
    assert_eq!(config.lock, 0xFC);
    assert!(!config.never_ready);

    let config = parse_options(&[("chip", "atmega8"), ("never_ready", "")]).unwrap();
    assert_eq!(config.signature, 0x1E9307);
    assert_eq!(config.fuses, FuseSet::new(0xE1, 0xD9, 0xFF));
    assert!(config.never_ready);

    assert!(parse_options(&[("sig", "1000000")]).is_err());
    assert!(parse_options(&[("high", "xyz")]).is_err());
    assert!(parse_options(&[("chip", "attiny13")]).is_err());
}

/// In-memory byte stream for driving the console
struct Script {
    input: Vec<u8>,
    pos: usize,
    output: Vec<u8>,
}

impl Script {
    fn new(input: &[u8]) -> Self {
        Self {
            input: input.to_vec(),
            pos: 0,
            output: Vec::new(),
        }
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl embedded_io::ErrorType for Script {
    type Error = core::convert::Infallible;
}

impl embedded_io::Read for Script {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.input.len() - self.pos);
        buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl embedded_io::Write for Script {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn run_console(config: DummyConfig, input: &[u8]) -> (DummyAvr, String) {
    let mut console = CommandConsole::new(engine(config), Script::new(input));
    console.run().unwrap();
    let (engine, io) = console.into_parts();
    assert_eq!(engine.state(), EngineState::Idle);
    let (target, _) = engine.into_inner();
    assert!(target.is_idle());
    (target, io.text())
}

#[test]
fn test_console_banner_and_menu() {
    let (_, out) = run_console(DummyConfig::default(), b"");
    assert!(out.starts_with("High-voltage Fuse Rescue Ver."));
    assert!(out.contains("ATmega328P(0x1E950F)"));
    assert!(out.contains("Fuse:0x62(low),0xD9(high),0xFF(ext)  Lock:0xFF"));
    assert!(out.contains("W:Write default Fuse bytes {0x62,0xD9,0xFF}\r\n"));
    assert!(out.contains("E:Erase device\r\n"));
}

#[test]
fn test_console_write_low_fuse() {
    let (target, out) = run_console(DummyConfig::default(), b"le2\ry\r");
    assert!(out.contains("Current Fuse(low) 0x62"));
    assert!(out.contains("New Fuse(low) 0xE2"));
    assert!(out.contains("Writing... complete."));
    assert_eq!(target.fuses().low, 0xE2);
}

#[test]
fn test_console_declined_write() {
    let (target, out) = run_console(DummyConfig::default(), b"hde\rn\r");
    assert!(out.contains("New Fuse(high) 0xDE"));
    assert!(!out.contains("Writing"));
    assert_eq!(target.strobes(), 0);
}

#[test]
fn test_console_empty_hex_leaves_value() {
    let (target, _) = run_console(DummyConfig::default(), b"x\r");
    assert_eq!(target.strobes(), 0);
}

#[test]
fn test_console_lock_mode_3_warning() {
    let (target, out) = run_console(DummyConfig::default(), b"kfc\rn\r");
    assert!(out.contains("New Lock bits:0xFC(LB mode 3"));
    assert_eq!(target.lock(), 0xFF);
}

#[test]
fn test_console_verify_mismatch_reported() {
    let config = DummyConfig {
        lock: 0xFC,
        ..Default::default()
    };
    let (_, out) = run_console(config, b"le2\ry\r");
    assert!(out.contains("Verify 0x62"));
}

#[test]
fn test_console_defaults_timeout() {
    let config = DummyConfig {
        never_ready: true,
        ..Default::default()
    };
    let (target, out) = run_console(config, b"wy\r");
    assert!(out.contains("low:0x62 Time out, Fuse can not be written."));
    assert!(!out.contains("high:"));
    assert_eq!(target.strobes(), 1);
}

#[test]
fn test_console_bootloader_defaults() {
    let (target, out) = run_console(DummyConfig::default(), b"ay\r");
    assert!(out.contains("low:0xFF high:0xDE ext:0x05  complete."));
    assert_eq!(target.fuses(), FuseSet::new(0xFF, 0xDE, 0x05));
}

#[test]
fn test_console_erase() {
    let config = DummyConfig {
        lock: 0xFC,
        ..Default::default()
    };
    let (target, out) = run_console(config, b"ey\r");
    assert!(out.contains("Erasing... complete."));
    assert_eq!(target.lock(), 0xFF);
}

#[test]
fn test_console_unknown_device() {
    let config = DummyConfig {
        signature: 0x000000,
        ..Default::default()
    };
    let (target, out) = run_console(config, b"ew");
    assert!(out.contains("Signature:0x000000  UNKNOWN DEVICE"));
    assert!(out.contains("'E' command is not available now."));
    assert!(out.contains("'W' command is not available now."));
    assert_eq!(target.strobes(), 0);
}
