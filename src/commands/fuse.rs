//! One-shot fuse commands

use std::time::Duration;

use hvrescue_core::device::{is_lock_mode_3, DeviceDescriptor, FuseLocation, FuseSnapshot};
use hvrescue_core::fuse::{check_verify, FuseEngine};
use hvrescue_core::programmer::ParallelPins;
use hvrescue_core::timeout::ThreadTimeoutMonitor;
use indicatif::{ProgressBar, ProgressStyle};

type Engine<'a> = FuseEngine<&'a mut dyn ParallelPins, ThreadTimeoutMonitor>;
type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Create an engine and identify the target, failing on unknown signatures
fn open_engine(
    pins: &mut dyn ParallelPins,
) -> Result<(Engine<'_>, &'static DeviceDescriptor), Box<dyn std::error::Error>> {
    let mut engine = FuseEngine::new(pins, ThreadTimeoutMonitor::new());
    let (signature, device) = engine.identify();
    match device {
        Some(device) => {
            println!("Device: {} (signature 0x{:06X})", device.name, signature);
            Ok((engine, device))
        }
        None => {
            engine.release();
            Err(format!(
                "Unknown device signature 0x{:06X}\n\
                 Check the wiring and use 'hvrescue list-devices' for supported parts",
                signature
            )
            .into())
        }
    }
}

fn spinner(message: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn print_snapshot(snapshot: &FuseSnapshot) {
    println!("  Low:  0x{:02X}", snapshot.fuses.low);
    println!("  High: 0x{:02X}", snapshot.fuses.high);
    println!("  Ext:  0x{:02X}", snapshot.fuses.extended);
    println!("  Lock: 0x{:02X}", snapshot.lock);
}

/// Identify the target and print its configuration registers
pub fn run_verify(pins: &mut dyn ParallelPins) -> CommandResult {
    let mut engine = FuseEngine::new(pins, ThreadTimeoutMonitor::new());
    let report = engine.verify();
    engine.release();

    match (report.device, report.fuses) {
        (Some(device), Some(snapshot)) => {
            println!(
                "Device: {} (signature 0x{:06X})",
                device.name, report.signature
            );
            print_snapshot(&snapshot);
            println!("Default fuses:    {}", device.default_fuse);
            println!("Bootloader fuses: {}", device.bootloader_fuse);
            if is_lock_mode_3(snapshot.lock) {
                println!("Lock mode 3 is active, only a chip erase can unlock the fuses");
            }
            Ok(())
        }
        _ => Err(format!("Unknown device signature 0x{:06X}", report.signature).into()),
    }
}

/// Print one fuse byte or the lock bits
pub fn run_read(pins: &mut dyn ParallelPins, location: FuseLocation) -> CommandResult {
    let (mut engine, _) = open_engine(pins)?;
    let value = engine.read_fuse(location);
    engine.release();
    println!("{}: 0x{:02X}", location, value?);
    Ok(())
}

/// Write one fuse byte and check the read-back
pub fn run_write_fuse(
    pins: &mut dyn ParallelPins,
    location: FuseLocation,
    value: u8,
) -> CommandResult {
    let (mut engine, _) = open_engine(pins)?;

    let pb = spinner(&format!("Writing {} fuse 0x{:02X}...", location, value))?;
    let result = engine
        .write_fuse(location, value)
        .and_then(|found| check_verify(location, value, found));
    let attempts = engine.retry_state().attempts;
    engine.release();

    match result {
        Ok(found) => {
            pb.finish_with_message(format!("{} fuse written: 0x{:02X}", location, found));
            log::debug!("{} write took {} attempt(s)", location, attempts);
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message(format!("{} fuse write failed", location));
            Err(e.into())
        }
    }
}

/// Write the lock bits, refusing lock mode 3 unless forced
pub fn run_write_lock(pins: &mut dyn ParallelPins, value: u8, force: bool) -> CommandResult {
    if is_lock_mode_3(value) {
        if !force {
            return Err(format!(
                "Lock value 0x{:02X} selects lock mode 3, which prevents any further \
                 fuse change until a chip erase.\nUse --force if this is intended",
                value
            )
            .into());
        }
        log::warn!("Writing lock mode 3, fuses will be locked until the next chip erase");
    }

    let (mut engine, _) = open_engine(pins)?;

    let pb = spinner(&format!("Writing lock bits 0x{:02X}...", value))?;
    let result = engine
        .write_lock(value)
        .and_then(|found| check_verify(FuseLocation::Lock, value, found));
    engine.release();

    match result {
        Ok(found) => {
            pb.finish_with_message(format!("Lock bits written: 0x{:02X}", found));
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Lock bit write failed".to_string());
            Err(e.into())
        }
    }
}

/// Restore the factory or bootloader fuse preset
pub fn run_defaults(pins: &mut dyn ParallelPins, bootloader: bool) -> CommandResult {
    let (mut engine, device) = open_engine(pins)?;
    let preset = if bootloader { "bootloader" } else { "default" };

    let pb = spinner(&format!(
        "Writing {} fuses {}...",
        preset,
        device.fuses(bootloader)
    ))?;
    let result = engine.write_fuse_defaults(bootloader);
    engine.release();

    match result {
        Ok(fuses) => {
            pb.finish_with_message(format!("Wrote {} fuses {}", preset, fuses));
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message(format!("Writing {} fuses failed", preset));
            Err(e.into())
        }
    }
}

/// Erase flash, EEPROM and lock bits
pub fn run_erase(pins: &mut dyn ParallelPins) -> CommandResult {
    let (mut engine, _) = open_engine(pins)?;

    let pb = spinner("Erasing chip...")?;
    let result = engine.erase_device();
    let attempts = engine.retry_state().attempts;
    engine.release();

    match result {
        Ok(()) => {
            pb.finish_with_message("Chip erased".to_string());
            log::debug!("Chip erase took {} attempt(s)", attempts);
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message(format!("Chip erase failed after {} attempts", attempts));
            Err(e.into())
        }
    }
}
