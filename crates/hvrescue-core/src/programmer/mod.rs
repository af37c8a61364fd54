//! Programmer traits and abstractions
//!
//! This module defines the pin-level trait every programmer backend
//! implements, and the [`SignalController`] that owns line state on top of it.

mod signals;
mod traits;

pub use signals::SignalController;
pub use traits::*;
