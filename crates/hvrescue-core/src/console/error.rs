use core::fmt;

use embedded_io::WriteFmtError;

/// Console transport failures
///
/// Engine errors are never returned here; they are printed and the console
/// goes back to waiting for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError<E> {
    /// The underlying reader or writer failed
    Io(E),
    /// Formatting output failed
    Fmt,
    /// The input stream reached end of file
    Closed,
}

impl<E> From<WriteFmtError<E>> for ConsoleError<E> {
    fn from(err: WriteFmtError<E>) -> Self {
        match err {
            WriteFmtError::Other(e) => Self::Io(e),
            _ => Self::Fmt,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for ConsoleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "console I/O error: {:?}", e),
            Self::Fmt => write!(f, "console formatting error"),
            Self::Closed => write!(f, "console input closed"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for ConsoleError<E> {}
