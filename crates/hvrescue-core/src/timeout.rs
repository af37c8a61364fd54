//! Software watchdog for operations that wait on RDY/BSY
//!
//! A [`TimeoutMonitor`] is a one-shot countdown that raises a sticky flag
//! when it elapses before being disarmed. On a microcontroller this is a
//! timer interrupt setting a static atomic; on a host the `std` feature
//! provides [`ThreadTimeoutMonitor`].

/// One-shot deadline with a sticky timeout flag
///
/// The countdown may expire concurrently with the caller, which must poll
/// [`timed_out`](TimeoutMonitor::timed_out) on every iteration of any wait
/// loop it guards.
pub trait TimeoutMonitor {
    /// Clear the flag and start a countdown of `deadline_ms` milliseconds
    fn arm(&mut self, deadline_ms: u32);

    /// Cancel the countdown, leaving the flag as it is
    fn disarm(&mut self);

    /// Returns true once an armed countdown has expired
    ///
    /// Stays true until the next [`arm`](TimeoutMonitor::arm).
    fn timed_out(&self) -> bool;
}

impl<T: TimeoutMonitor + ?Sized> TimeoutMonitor for &mut T {
    fn arm(&mut self, deadline_ms: u32) {
        (**self).arm(deadline_ms)
    }

    fn disarm(&mut self) {
        (**self).disarm()
    }

    fn timed_out(&self) -> bool {
        (**self).timed_out()
    }
}

#[cfg(feature = "std")]
pub use thread_monitor::ThreadTimeoutMonitor;

#[cfg(feature = "std")]
mod thread_monitor {
    use super::TimeoutMonitor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, RecvTimeoutError, Sender};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};
    use std::time::{Duration, Instant};

    struct Countdown {
        cancel: Sender<()>,
        handle: JoinHandle<()>,
    }

    /// [`TimeoutMonitor`] backed by a timer thread and an atomic flag
    ///
    /// Each [`arm`](TimeoutMonitor::arm) spawns a thread that sleeps on a
    /// channel until either the deadline passes (flag set) or the sender is
    /// dropped by [`disarm`](TimeoutMonitor::disarm) (flag untouched).
    /// Disarming joins the thread, so a stale countdown can never set the
    /// flag of a later one.
    pub struct ThreadTimeoutMonitor {
        flag: Arc<AtomicBool>,
        countdown: Option<Countdown>,
        // Only used if the timer thread could not be spawned
        deadline: Option<Instant>,
    }

    impl ThreadTimeoutMonitor {
        /// Create a disarmed monitor with the flag cleared
        pub fn new() -> Self {
            Self {
                flag: Arc::new(AtomicBool::new(false)),
                countdown: None,
                deadline: None,
            }
        }
    }

    impl Default for ThreadTimeoutMonitor {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TimeoutMonitor for ThreadTimeoutMonitor {
        fn arm(&mut self, deadline_ms: u32) {
            self.disarm();
            self.flag.store(false, Ordering::SeqCst);

            let duration = Duration::from_millis(deadline_ms as u64);
            let (cancel, rx) = mpsc::channel::<()>();
            let flag = Arc::clone(&self.flag);
            let spawned = thread::Builder::new()
                .name("hvpp-timeout".into())
                .spawn(move || {
                    if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(duration) {
                        flag.store(true, Ordering::SeqCst);
                    }
                });

            match spawned {
                Ok(handle) => self.countdown = Some(Countdown { cancel, handle }),
                Err(e) => {
                    log::warn!("Failed to spawn timeout thread ({}), polling the clock", e);
                    self.deadline = Some(Instant::now() + duration);
                }
            }
        }

        fn disarm(&mut self) {
            if let Some(countdown) = self.countdown.take() {
                drop(countdown.cancel);
                if countdown.handle.join().is_err() {
                    log::error!("Timeout thread panicked");
                }
            }
            self.deadline = None;
        }

        fn timed_out(&self) -> bool {
            if self.flag.load(Ordering::SeqCst) {
                return true;
            }
            match self.deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    self.flag.store(true, Ordering::SeqCst);
                    true
                }
                _ => false,
            }
        }
    }

    impl Drop for ThreadTimeoutMonitor {
        fn drop(&mut self) {
            self.disarm();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_expires() {
            let mut monitor = ThreadTimeoutMonitor::new();
            monitor.arm(10);
            let start = Instant::now();
            while !monitor.timed_out() {
                assert!(start.elapsed() < Duration::from_secs(2));
                thread::yield_now();
            }
            monitor.disarm();
            assert!(monitor.timed_out(), "flag must stay set after disarm");
        }

        #[test]
        fn test_disarm_before_deadline() {
            let mut monitor = ThreadTimeoutMonitor::new();
            monitor.arm(200);
            monitor.disarm();
            thread::sleep(Duration::from_millis(250));
            assert!(!monitor.timed_out());
        }

        #[test]
        fn test_rearm_clears_flag() {
            let mut monitor = ThreadTimeoutMonitor::new();
            monitor.arm(1);
            thread::sleep(Duration::from_millis(50));
            assert!(monitor.timed_out());
            monitor.arm(1000);
            assert!(!monitor.timed_out());
            monitor.disarm();
        }
    }
}
