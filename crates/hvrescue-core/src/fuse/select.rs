//! Byte-select tables
//!
//! The read and write paths address the fuse registers with different
//! (BS1, BS2) combinations, so they are kept as two tables.

use crate::device::FuseLocation;
use crate::programmer::Level;

/// Levels of the byte-select pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSelect {
    /// BS1 level
    pub bs1: Level,
    /// BS2 level
    pub bs2: Level,
}

impl ByteSelect {
    const fn new(bs1: bool, bs2: bool) -> Self {
        Self {
            bs1: if bs1 { Level::High } else { Level::Low },
            bs2: if bs2 { Level::High } else { Level::Low },
        }
    }
}

/// Selection used with the read fuse/lock command
pub const fn read_select(location: FuseLocation) -> ByteSelect {
    match location {
        FuseLocation::Low => ByteSelect::new(false, false),
        FuseLocation::High => ByteSelect::new(true, true),
        FuseLocation::Extended => ByteSelect::new(false, true),
        FuseLocation::Lock => ByteSelect::new(true, false),
    }
}

/// Selection used with the write fuse and write lock commands
///
/// The lock register only needs BS1; BS2 stays at its armed low level.
pub const fn write_select(location: FuseLocation) -> ByteSelect {
    match location {
        FuseLocation::Low => ByteSelect::new(false, false),
        FuseLocation::High => ByteSelect::new(true, false),
        FuseLocation::Extended => ByteSelect::new(false, true),
        FuseLocation::Lock => ByteSelect::new(true, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_differ_for_high() {
        assert_ne!(
            read_select(FuseLocation::High),
            write_select(FuseLocation::High)
        );
        assert_eq!(
            read_select(FuseLocation::Extended),
            write_select(FuseLocation::Extended)
        );
    }

    #[test]
    fn test_lock_select() {
        let sel = read_select(FuseLocation::Lock);
        assert_eq!(sel.bs1, Level::High);
        assert_eq!(sel.bs2, Level::Low);
    }
}
