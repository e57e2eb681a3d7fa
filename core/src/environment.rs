//! Injected dependencies for the service layer.
//!
//! Time is the only ambient dependency the core needs; injecting it keeps
//! timestamp-sensitive behavior deterministic in tests (see `FixedClock` in
//! `muster-testing`).

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Implementations must be `Send + Sync` so they can be shared across async
/// tasks behind an `Arc`.
pub trait Clock: Send + Sync {
    /// The current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let earlier = clock.now();
        assert!(clock.now() >= earlier);
    }
}
