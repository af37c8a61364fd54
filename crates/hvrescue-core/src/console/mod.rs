//! Interactive command console
//!
//! [`CommandConsole`] runs the operator dialogue over any byte stream that
//! implements [`embedded_io::Read`] and [`embedded_io::Write`]: a UART on a
//! microcontroller, or stdin/stdout on a host.
//!
//! Commands are single letters from [`Command::ALPHABET`], case-insensitive,
//! accepted as soon as they are typed. Yes/no questions and the second digit
//! of a hex value are confirmed with Enter. Backspace removes the last
//! accepted character, anything else outside the expected set rings the bell.
//!
//! A cooked terminal already echoes input and only delivers it line by line.
//! [`CommandConsole::with_line_input`] switches to that model: command
//! letters wait for Enter as well and nothing typed is echoed back.

mod command;
mod error;

pub use command::Command;
pub use error::ConsoleError;

use embedded_io::{ErrorType, Read, Write};

use crate::device::{is_lock_mode_3, FuseLocation};
use crate::error::Error;
use crate::fuse::{check_verify, DeviceReport, FuseEngine};
use crate::programmer::ParallelPins;
use crate::timeout::TimeoutMonitor;

const BELL: u8 = 0x07;
const BACKSPACE: u8 = 0x08;
const HEX_DIGITS: &[u8] = b"0123456789ABCDEF";
const RULE: &str = "_________________________________________________";

/// Result type for console operations
pub type ConsoleResult<T, IO> = core::result::Result<T, ConsoleError<<IO as ErrorType>::Error>>;

/// Value of one uppercase hex digit
pub fn hex_digit(c: u8) -> crate::Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::InvalidInput),
    }
}

/// Value of a digit that already passed the [`HEX_DIGITS`] mask
fn hex(c: u8) -> u8 {
    debug_assert!(HEX_DIGITS.contains(&c));
    hex_digit(c).unwrap_or(0)
}

/// Operator dialogue driving a [`FuseEngine`]
pub struct CommandConsole<P: ParallelPins, T: TimeoutMonitor, IO: Read + Write> {
    engine: FuseEngine<P, T>,
    io: IO,
    show_menu: bool,
    line_input: bool,
}

impl<P, T, IO> CommandConsole<P, T, IO>
where
    P: ParallelPins,
    T: TimeoutMonitor,
    IO: Read + Write,
{
    /// Attach an engine to a byte stream
    pub fn new(engine: FuseEngine<P, T>, io: IO) -> Self {
        Self {
            engine,
            io,
            show_menu: true,
            line_input: false,
        }
    }

    /// Expect line buffered input that the terminal echoes itself
    pub fn with_line_input(mut self, line_input: bool) -> Self {
        self.line_input = line_input;
        self
    }

    /// Borrow the engine
    pub fn engine(&self) -> &FuseEngine<P, T> {
        &self.engine
    }

    /// Borrow the byte stream
    pub fn io(&self) -> &IO {
        &self.io
    }

    /// Split into engine and byte stream
    pub fn into_parts(self) -> (FuseEngine<P, T>, IO) {
        (self.engine, self.io)
    }

    /// Print the banner, identify the target and serve commands until end of input
    pub fn run(&mut self) -> ConsoleResult<(), IO> {
        write!(
            self.io,
            "High-voltage Fuse Rescue Ver.{}\r\n",
            env!("CARGO_PKG_VERSION")
        )?;
        self.verify()?;
        loop {
            match self.step() {
                Ok(()) => {}
                Err(ConsoleError::Closed) => {
                    log::debug!("console: input closed");
                    self.engine.release();
                    return Ok(());
                }
                Err(e) => {
                    self.engine.release();
                    return Err(e);
                }
            }
        }
    }

    /// Show the menu if needed, read one command and execute it
    pub fn step(&mut self) -> ConsoleResult<(), IO> {
        if self.show_menu {
            self.menu()?;
        }
        let letter = loop {
            let momently = !self.line_input;
            if let Some(letter) = self.inquiry("\r\nEnter command -->", Command::ALPHABET, momently)? {
                break letter;
            }
        };
        write!(self.io, "\r\n")?;

        let Some(command) = Command::from_letter(letter) else {
            return Ok(());
        };
        if command.needs_device() && self.engine.device().is_none() {
            write!(
                self.io,
                "'{}' command is not available now.\r\n",
                char::from(letter)
            )?;
            self.show_menu = false;
            return Ok(());
        }

        log::debug!("console: command {:?}", command);
        self.show_menu = true;
        self.execute(command)
    }

    /// Run one command, printing its outcome
    pub fn execute(&mut self, command: Command) -> ConsoleResult<(), IO> {
        match command {
            Command::WriteLow | Command::WriteHigh | Command::WriteExtended => {
                if let Some(location) = command.location() {
                    self.write_single(location)?;
                }
            }
            Command::WriteLock => self.write_lock()?,
            Command::WriteDefaults => self.write_defaults(false)?,
            Command::WriteBootloader => self.write_defaults(true)?,
            Command::Erase => self.erase()?,
            Command::Verify => self.verify()?,
        }
        self.io.flush().map_err(ConsoleError::Io)
    }

    /// Print the commands available in the current state
    pub fn menu(&mut self) -> ConsoleResult<(), IO> {
        write!(self.io, "\r\n{}\r\n", RULE)?;
        let device = self.engine.device();
        for command in Command::available(device.is_some()) {
            write!(
                self.io,
                "{}:{}",
                char::from(command.letter()),
                command.description()
            )?;
            if let (Command::WriteDefaults, Some(device)) = (command, device) {
                write!(self.io, " {}", device.default_fuse)?;
            }
            write!(self.io, "\r\n")?;
        }
        Ok(())
    }

    /// Prompt and read one character from `mask`
    ///
    /// Letters are upper-cased before matching. With `momently` the first
    /// accepted character ends the input; otherwise input ends at CR or LF
    /// and the last accepted character is returned. `None` means nothing
    /// was accepted.
    pub fn inquiry(&mut self, prompt: &str, mask: &[u8], momently: bool) -> ConsoleResult<Option<u8>, IO> {
        self.io.write_all(prompt.as_bytes()).map_err(ConsoleError::Io)?;
        self.io.flush().map_err(ConsoleError::Io)?;

        let mut accepted: Option<u8> = None;
        let mut count = 0usize;
        loop {
            let c = self.read_byte()?.to_ascii_uppercase();
            match c {
                BACKSPACE => {
                    if count > 0 {
                        self.echo(c)?;
                        accepted = None;
                        count -= 1;
                    }
                }
                b'\r' | b'\n' => {
                    if !self.line_input {
                        write!(self.io, "\r\n")?;
                    }
                    return Ok(accepted);
                }
                _ if mask.contains(&c) => {
                    self.echo(c)?;
                    accepted = Some(c);
                    count += 1;
                    if momently {
                        return Ok(accepted);
                    }
                }
                _ => {
                    log::trace!("console: rejected 0x{:02X}", c);
                    self.echo(BELL)?;
                }
            }
        }
    }

    /// Prompt for a one or two digit hex value
    ///
    /// The first digit is taken as typed, the second must be confirmed with
    /// Enter. `None` if Enter was pressed without a digit.
    pub fn inquiry_hex(&mut self, prompt: &str) -> ConsoleResult<Option<u8>, IO> {
        let Some(first) = self.inquiry(prompt, HEX_DIGITS, true)? else {
            return Ok(None);
        };
        let mut value = hex(first);
        if let Some(second) = self.inquiry("", HEX_DIGITS, false)? {
            value = (value << 4) | hex(second);
        }
        Ok(Some(value))
    }

    /// Ask a Y/N question confirmed with Enter
    pub fn confirm(&mut self, prompt: &str) -> ConsoleResult<bool, IO> {
        Ok(self.inquiry(prompt, b"YN", false)? == Some(b'Y'))
    }

    fn read_byte(&mut self) -> ConsoleResult<u8, IO> {
        let mut buf = [0u8; 1];
        match self.io.read(&mut buf).map_err(ConsoleError::Io)? {
            0 => Err(ConsoleError::Closed),
            _ => Ok(buf[0]),
        }
    }

    fn echo(&mut self, c: u8) -> ConsoleResult<(), IO> {
        if self.line_input && c != BELL {
            return Ok(());
        }
        self.io.write_all(&[c]).map_err(ConsoleError::Io)
    }

    fn verify(&mut self) -> ConsoleResult<(), IO> {
        write!(self.io, "  Verify the target... ")?;
        let DeviceReport {
            signature,
            device,
            fuses,
        } = self.engine.verify();
        match (device, fuses) {
            (Some(device), Some(snapshot)) => write!(
                self.io,
                "{}(0x{:06X})\r\n  Fuse:0x{:02X}(low),0x{:02X}(high),0x{:02X}(ext)  Lock:0x{:02X}\r\n",
                device.name,
                signature,
                snapshot.fuses.low,
                snapshot.fuses.high,
                snapshot.fuses.extended,
                snapshot.lock
            )?,
            _ => write!(self.io, "Signature:0x{:06X}  UNKNOWN DEVICE\r\n", signature)?,
        }
        Ok(())
    }

    fn write_single(&mut self, location: FuseLocation) -> ConsoleResult<(), IO> {
        let current = match self.engine.read_fuse(location) {
            Ok(value) => value,
            Err(e) => return self.report(location, 0, Err(e)),
        };
        write!(self.io, "Current Fuse({}) 0x{:02X} ", location, current)?;
        let Some(value) =
            self.inquiry_hex(", Enter new value (HEX, NULL leave w/o change) --> ")?
        else {
            return Ok(());
        };
        write!(self.io, "    New Fuse({}) 0x{:02X}", location, value)?;
        if self.confirm(".  Write ? (Y/N) ")? {
            write!(self.io, "  Writing... ")?;
            let result = self.engine.write_fuse(location, value);
            self.report(location, value, result)?;
        }
        Ok(())
    }

    fn write_lock(&mut self) -> ConsoleResult<(), IO> {
        let current = match self.engine.read_fuse(FuseLocation::Lock) {
            Ok(value) => value,
            Err(e) => return self.report(FuseLocation::Lock, 0, Err(e)),
        };
        write!(self.io, "Current Lock bits 0x{:02X}", current)?;
        let Some(value) =
            self.inquiry_hex(", Enter new value (HEX, NULL leave w/o change) --> ")?
        else {
            return Ok(());
        };
        write!(self.io, "    New Lock bits:0x{:02X}", value)?;
        if is_lock_mode_3(value) {
            write!(self.io, "(LB mode 3, Lock bits and Fuse bytes will be locked!)")?;
        }
        if self.confirm(".  Write ? (Y/N) ")? {
            write!(self.io, "  Writing... ")?;
            let result = self.engine.write_lock(value);
            self.report(FuseLocation::Lock, value, result)?;
        }
        Ok(())
    }

    fn write_defaults(&mut self, bootloader: bool) -> ConsoleResult<(), IO> {
        if self.engine.device().is_none() {
            return self.report(FuseLocation::Low, 0, Err(Error::UnknownDevice));
        }
        let prompt = if bootloader {
            "Write Fuse bytes for Arduino bootloader ? (Y/N) "
        } else {
            "Write default Fuse bytes ? (Y/N) "
        };
        if !self.confirm(prompt)? {
            return Ok(());
        }

        write!(self.io, "  Writing... ")?;
        let io = &mut self.io;
        let mut shown: ConsoleResult<(), IO> = Ok(());
        let result = self
            .engine
            .write_fuse_defaults_with(bootloader, |location, value| {
                if shown.is_ok() {
                    shown = write!(io, "{}:0x{:02X} ", location, value)
                        .map_err(ConsoleError::from);
                }
            });
        shown?;
        match result {
            Ok(_) => write!(self.io, " complete.")?,
            // Only fuse bytes are written here, the location just picks the wording
            Err(e) => return self.report(FuseLocation::Low, 0, Err(e)),
        }
        Ok(())
    }

    fn erase(&mut self) -> ConsoleResult<(), IO> {
        if !self.confirm("Flash and EEPROM, Lock bits will be cleared. Erase ? (Y/N) ")? {
            return Ok(());
        }
        write!(self.io, "Erasing... ")?;
        match self.engine.erase_device() {
            Ok(()) => write!(self.io, "complete.")?,
            Err(e) if e.is_timeout() => write!(self.io, "Time out, chip can not be erased.")?,
            Err(e) => write!(self.io, "{}.", e)?,
        }
        Ok(())
    }

    fn report(
        &mut self,
        location: FuseLocation,
        expected: u8,
        result: crate::Result<u8>,
    ) -> ConsoleResult<(), IO> {
        let what = match location {
            FuseLocation::Lock => "Lock bits",
            _ => "Fuse",
        };
        match result.and_then(|found| check_verify(location, expected, found)) {
            Ok(_) => write!(self.io, "complete.")?,
            Err(e) if e.is_timeout() => {
                write!(self.io, "Time out, {} can not be written.", what)?
            }
            Err(Error::VerifyMismatch { found, .. }) => write!(self.io, "Verify 0x{:02X}", found)?,
            Err(e) => write!(self.io, "{}.", e)?,
        }
        Ok(())
    }
}
