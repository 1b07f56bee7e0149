//! Time provider abstraction for testable time-dependent logic

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::time::SystemTime;

/// Abstraction over system time for testable time-dependent logic
pub trait TimeProvider: Send + Sync {
    /// Current system time (for record timestamps)
    fn system_time(&self) -> SystemTime;

    /// Current UTC wall-clock time
    fn now_utc(&self) -> DateTime<Utc>;

    /// Today's local calendar date (partition keys roll over at local midnight)
    fn today(&self) -> NaiveDate;
}

/// Production time provider using actual system time
#[derive(Debug, Default, Clone)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Mock time provider for deterministic testing
#[cfg(test)]
pub struct MockTimeProvider {
    current: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl MockTimeProvider {
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            current: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut current = self.current.lock().unwrap();
        *current += duration;
    }
}

#[cfg(test)]
impl TimeProvider for MockTimeProvider {
    fn system_time(&self) -> SystemTime {
        let current = self.current.lock().unwrap();
        SystemTime::from(*current)
    }

    fn now_utc(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap()
    }

    fn today(&self) -> NaiveDate {
        self.current.lock().unwrap().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mock_provider_advances_across_midnight() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 23, 30, 0).unwrap();
        let clock = MockTimeProvider::at(start);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());

        clock.advance(chrono::Duration::hours(1));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
    }

    #[test]
    fn test_system_provider_is_consistent() {
        let clock = SystemTimeProvider;
        let before = clock.now_utc();
        let after = clock.now_utc();
        assert!(after >= before);
    }
}
