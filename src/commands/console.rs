//! Interactive console command

use hvrescue_core::console::{CommandConsole, ConsoleError};
use hvrescue_core::fuse::FuseEngine;
use hvrescue_core::programmer::ParallelPins;
use hvrescue_core::timeout::ThreadTimeoutMonitor;

use super::stdio::Stdio;

/// Run the rescue console on the controlling terminal until end of input
pub fn run_console(pins: &mut dyn ParallelPins) -> Result<(), Box<dyn std::error::Error>> {
    let engine = FuseEngine::new(pins, ThreadTimeoutMonitor::new());
    // Terminals deliver input a line at a time unless put into raw mode
    let mut console = CommandConsole::new(engine, Stdio::new()).with_line_input(true);

    match console.run() {
        Ok(()) | Err(ConsoleError::Closed) => {
            log::debug!("Console closed");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
