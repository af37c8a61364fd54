//! Parallel programming command bytes and timing constants

/// Chip erase (flash, EEPROM and lock bits)
pub const CHIP_ERASE: u8 = 0x80;
/// Write a fuse byte, selected by BS1/BS2
pub const WRITE_FUSE: u8 = 0x40;
/// Write the lock bits
pub const WRITE_LOCK: u8 = 0x20;
/// Read signature bytes, addressed by the low address byte
pub const READ_SIGNATURE: u8 = 0x08;
/// Read a fuse byte or the lock bits, selected by BS1/BS2
pub const READ_FUSE_LOCK: u8 = 0x04;

/// Settle time after switching on the target supply
pub const VCC_SETTLE_US: u32 = 30;
/// Settle time after applying +12V to reset
pub const HV_SETTLE_US: u32 = 10;
/// Wait after releasing RDY/BSY before the first transfer
pub const PROGRAM_ENTRY_US: u32 = 300;
/// Hold time on each XTAL1 edge
pub const CLOCK_HOLD_US: u32 = 1;
/// Settle time after a bus read before the next step
pub const READ_SETTLE_MS: u32 = 1;
/// Settle time after the WR pulse before polling RDY/BSY
pub const WRITE_SETTLE_US: u32 = 1;
/// Pause before each write attempt
pub const PRE_WRITE_DELAY_MS: u32 = 9;
/// Pause after a write sequence completes
pub const POST_WRITE_DELAY_MS: u32 = 100;
/// RDY/BSY deadline for a single write or erase
pub const WRITE_TIMEOUT_MS: u32 = 200;
/// Retries after the first fuse write attempt, and total chip erase attempts
pub const MAX_RETRIES: u8 = 3;
