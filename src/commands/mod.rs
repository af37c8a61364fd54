//! Command implementations

mod console;
mod fuse;
mod list;
mod stdio;

pub use console::run_console;
pub use fuse::{run_defaults, run_erase, run_read, run_verify, run_write_fuse, run_write_lock};
pub use list::{list_devices, list_programmers};
