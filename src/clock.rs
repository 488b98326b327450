//! Wall-clock abstraction so expiry logic can be driven from tests.

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use mock::MockClock;

#[cfg(test)]
mod mock {
    use super::Clock;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    /// Time only moves when [`advance`](MockClock::advance) is called.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        current: Arc<Mutex<DateTime<Utc>>>,
    }

    impl MockClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                current: Arc::new(Mutex::new(start)),
            }
        }

        pub fn advance(&self, duration: Duration) {
            let step = chrono::Duration::from_std(duration).expect("duration out of range");
            *self.current.lock() += step;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self.current.lock()
        }
    }

    mod tests {
        use super::*;
        use chrono::TimeZone;

        #[test]
        fn test_mock_clock_only_moves_on_advance() {
            let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            let clock = MockClock::new(start);
            assert_eq!(clock.now(), start);

            clock.advance(Duration::from_secs(90));
            assert_eq!(clock.now(), start + chrono::Duration::seconds(90));
        }
    }
}
