//! Console command alphabet

use crate::device::FuseLocation;

/// One console command, selected by a single letter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Write the low fuse byte
    WriteLow,
    /// Write the high fuse byte
    WriteHigh,
    /// Write the extended fuse byte
    WriteExtended,
    /// Write the lock bits
    WriteLock,
    /// Write the factory default fuses
    WriteDefaults,
    /// Write the bootloader fuses
    WriteBootloader,
    /// Chip erase
    Erase,
    /// Identify the target and show its fuses
    Verify,
}

impl Command {
    /// Every command, in menu order
    pub const ALL: [Command; 8] = [
        Self::WriteLow,
        Self::WriteHigh,
        Self::WriteExtended,
        Self::WriteLock,
        Self::WriteDefaults,
        Self::WriteBootloader,
        Self::Erase,
        Self::Verify,
    ];

    /// Accepted command letters
    pub const ALPHABET: &'static [u8] = b"LHXKWAEV";

    /// Command for an (uppercase) letter
    pub fn from_letter(letter: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.letter() == letter)
    }

    /// Letter that selects this command
    pub const fn letter(self) -> u8 {
        match self {
            Self::WriteLow => b'L',
            Self::WriteHigh => b'H',
            Self::WriteExtended => b'X',
            Self::WriteLock => b'K',
            Self::WriteDefaults => b'W',
            Self::WriteBootloader => b'A',
            Self::Erase => b'E',
            Self::Verify => b'V',
        }
    }

    /// Menu text
    pub const fn description(self) -> &'static str {
        match self {
            Self::WriteLow => "Write low Fuse byte",
            Self::WriteHigh => "Write high Fuse byte",
            Self::WriteExtended => "Write extended Fuse byte",
            Self::WriteLock => "Write Lock bits",
            Self::WriteDefaults => "Write default Fuse bytes",
            Self::WriteBootloader => "Write Fuse bytes for Arduino bootloader",
            Self::Erase => "Erase device",
            Self::Verify => "Verify device",
        }
    }

    /// Register a single-byte write command targets
    pub const fn location(self) -> Option<FuseLocation> {
        match self {
            Self::WriteLow => Some(FuseLocation::Low),
            Self::WriteHigh => Some(FuseLocation::High),
            Self::WriteExtended => Some(FuseLocation::Extended),
            Self::WriteLock => Some(FuseLocation::Lock),
            _ => None,
        }
    }

    /// Returns true if the command requires an identified device
    pub const fn needs_device(self) -> bool {
        !matches!(self, Self::Verify)
    }

    /// Commands that can run with or without an identified device, in menu order
    pub fn available(device_known: bool) -> heapless::Vec<Command, 8> {
        Self::ALL
            .into_iter()
            .filter(|c| device_known || !c.needs_device())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_matches_commands() {
        assert_eq!(Command::ALPHABET.len(), Command::ALL.len());
        for (letter, command) in Command::ALPHABET.iter().zip(Command::ALL) {
            assert_eq!(Command::from_letter(*letter), Some(command));
        }
        assert_eq!(Command::from_letter(b'Q'), None);
        assert_eq!(Command::from_letter(b'v'), None);
    }

    #[test]
    fn test_only_verify_without_device() {
        assert_eq!(Command::available(false).as_slice(), &[Command::Verify]);
        assert_eq!(Command::available(true).as_slice(), &Command::ALL);
    }
}
