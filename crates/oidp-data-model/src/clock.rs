// Copyright 2025, 2026 Element Creations Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only
// Please see LICENSE in the repository root for full details.

//! Time is always read through the [`Clock`] abstraction so that tests can
//! inject deterministic time.

use std::sync::{Arc, atomic::AtomicI64, atomic::Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// A clock which reads the wall clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A fake clock for tests, which only advances when told to.
pub struct MockClock {
    timestamp: AtomicI64,
}

impl Default for MockClock {
    fn default() -> Self {
        let datetime = Utc.with_ymd_and_hms(2022, 1, 16, 14, 40, 0).unwrap();
        Self::new(datetime)
    }
}

impl MockClock {
    /// Create a mock clock frozen at the given time.
    #[must_use]
    pub fn new(datetime: DateTime<Utc>) -> Self {
        let timestamp = AtomicI64::new(datetime.timestamp_micros());
        Self { timestamp }
    }

    /// Move the clock forward (or backward, with a negative duration).
    ///
    /// # Panics
    ///
    /// Panics if the duration is too large to be represented in
    /// microseconds.
    pub fn advance(&self, duration: Duration) {
        let micros = duration
            .num_microseconds()
            .expect("duration in microseconds overflowed");
        self.timestamp.fetch_add(micros, Ordering::Relaxed);
    }

    /// Jump to the given time.
    pub fn jump(&self, datetime: DateTime<Utc>) {
        self.timestamp
            .store(datetime.timestamp_micros(), Ordering::Relaxed);
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        let timestamp = self.timestamp.load(Ordering::Relaxed);
        DateTime::from_timestamp_micros(timestamp).expect("mock clock timestamp out of range")
    }
}
