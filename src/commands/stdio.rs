//! Terminal transport for the command console

use std::io::{self, Read as _, Stdin, Stdout, Write as _};

use thiserror::Error;

/// Error raised by the standard streams
#[derive(Debug, Error)]
#[error("terminal I/O failed: {0}")]
pub struct StdioError(#[from] io::Error);

impl embedded_io::Error for StdioError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

/// stdin/stdout pair exposed as an `embedded_io` byte stream
pub struct Stdio {
    stdin: Stdin,
    stdout: Stdout,
}

impl Stdio {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
        }
    }
}

impl Default for Stdio {
    fn default() -> Self {
        Self::new()
    }
}

impl embedded_io::ErrorType for Stdio {
    type Error = StdioError;
}

impl embedded_io::Read for Stdio {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        // The console prompts before blocking on input
        self.stdout.flush()?;
        loop {
            match self.stdin.lock().read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return Ok(result?),
            }
        }
    }
}

impl embedded_io::Write for Stdio {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(self.stdout.write(buf)?)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(self.stdout.flush()?)
    }
}
