//! AVR device types and registry
//!
//! This module provides types for describing the AVR parts that can be
//! rescued, and a compiled-in registry keyed by the 3-byte signature.

mod database;
mod types;

pub use database::*;
pub use types::*;
