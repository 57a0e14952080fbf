//! Time source abstraction.
//!
//! Decouples the one time-dependent codec (the legacy time-of-day codec,
//! which re-attaches the current year on decode) from the system clock, so
//! tests can pin time and stay deterministic.

/// Injectable wall-clock time source.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch, UTC.
    fn now_unix(&self) -> i64;
}

/// Production clock backed by [`std::time::SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            // Clock before 1970: treat as the epoch rather than fail a
            // decode over it.
            Err(_) => 0,
        }
    }
}
