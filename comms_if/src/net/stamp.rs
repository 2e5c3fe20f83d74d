//! Per-sender message stamps

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::Utc;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Wall-clock millisecond stamps which never repeat nor go backwards.
///
/// If the clock has not advanced (or has stepped back) since the last stamp, the last stamp plus
/// one is used instead.
#[derive(Debug, Default, Clone)]
pub struct StampClock {
    last: Option<u64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StampClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a stamp for a new message.
    pub fn next(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.next_at(now)
    }

    /// Get a stamp for a new message given the current wall-clock time in milliseconds.
    pub fn next_at(&mut self, now_ms: u64) -> u64 {
        let stamp = match self.last {
            Some(last) if now_ms <= last => last + 1,
            _ => now_ms,
        };

        self.last = Some(stamp);
        stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictly_increasing() {
        let mut clock = StampClock::new();

        assert_eq!(clock.next_at(1000), 1000);
        assert_eq!(clock.next_at(1000), 1001);
        assert_eq!(clock.next_at(1000), 1002);
        assert_eq!(clock.next_at(990), 1003);
        assert_eq!(clock.next_at(2000), 2000);

        let a = clock.next();
        let b = clock.next();
        assert!(b > a);
    }
}
