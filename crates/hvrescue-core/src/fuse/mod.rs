//! Fuse and lock bit operations
//!
//! [`FuseEngine`] is the device-aware layer: it identifies the target,
//! gates every modifying operation on a known device, and implements the
//! write/verify retry policy on top of the [`Sequencer`](crate::protocol::Sequencer).

mod engine;
mod select;

pub use engine::*;
pub use select::*;
