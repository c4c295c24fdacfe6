//! Deadlines carried by every store call.

use std::time::{Duration, Instant};

use crate::Error;

/// The point in time by which a store call or unit of work must finish.
///
/// Deadlines are cooperative: the async side stops waiting once the deadline
/// passes, and the statement layer checks it before every statement and
/// before commit so late work is rolled back rather than committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self { at: Instant::now() + timeout }
    }

    /// A deadline at a fixed instant.
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Fail with `DeadlineExceeded` once the deadline has passed.
    pub fn check(&self) -> Result<(), Error> {
        if self.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_future_deadline() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(!deadline.is_expired());
        assert!(deadline.check().is_ok());
        assert!(deadline.remaining() > Duration::from_secs(59));
    }

    #[test]
    fn test_expired_deadline() {
        let deadline = Deadline::at(Instant::now());
        std::thread::sleep(Duration::from_millis(1));
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
        assert!(matches!(deadline.check(), Err(Error::DeadlineExceeded)));
    }
}
