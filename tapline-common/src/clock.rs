//! Wall-clock abstraction
//!
//! Recorded timestamps and dedup-window comparisons go through an injected
//! clock so tests can step time explicitly instead of sleeping.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Source of the current UTC time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward by `millis`
    pub fn advance_millis(&self, millis: i64) {
        let mut current = self.current.lock().expect("clock lock poisoned");
        *current += Duration::milliseconds(millis);
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut current = self.current.lock().expect("clock lock poisoned");
        *current = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().expect("clock lock poisoned")
    }
}
