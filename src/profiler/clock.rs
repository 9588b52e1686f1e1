//=====================================================
// File: profiler/clock.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Timing sources for call-path attribution
// Objective: Provide wall-clock, monotonic, and synthetic clocks behind one
//            fallible interface so a failed read degrades to zero time
//=====================================================

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// A point in time split into whole seconds and a nanosecond remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    secs: u64,
    nanos: u32,
}

impl Timestamp {
    pub fn new(secs: u64, nanos: u32) -> Self {
        let carry = u64::from(nanos / 1_000_000_000);
        Self {
            secs: secs + carry,
            nanos: nanos % 1_000_000_000,
        }
    }

    pub fn from_nanos(nanos: u64) -> Self {
        Self::new(nanos / 1_000_000_000, (nanos % 1_000_000_000) as u32)
    }

    pub fn secs(&self) -> u64 {
        self.secs
    }

    pub fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    /// Nanoseconds from `earlier` to `self`: whole seconds times 1e9 plus the
    /// nanosecond remainder. A clock that stepped backwards yields zero.
    pub fn nanos_since(&self, earlier: Timestamp) -> u64 {
        let secs = i128::from(self.secs) - i128::from(earlier.secs);
        let nanos = i128::from(self.nanos) - i128::from(earlier.nanos);
        let delta = secs * NANOS_PER_SEC + nanos;
        if delta <= 0 {
            0
        } else {
            u64::try_from(delta).unwrap_or(u64::MAX)
        }
    }
}

impl From<Duration> for Timestamp {
    fn from(duration: Duration) -> Self {
        Self::new(duration.as_secs(), duration.subsec_nanos())
    }
}

/// Source of "now" for the profiler. `None` means the read failed.
pub trait Clock {
    fn now(&self) -> Option<Timestamp>;
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> Option<Timestamp> {
        (**self).now()
    }
}

/// Monotonic clock anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Option<Timestamp> {
        Some(self.origin.elapsed().into())
    }
}

/// System real-time clock. May step backwards or sit before the epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealtimeClock;

impl Clock for RealtimeClock {
    fn now(&self) -> Option<Timestamp> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(Timestamp::from)
    }
}

/// Synthetic clock for tests. Clones share the same time, so a test can keep
/// one handle and move another into the profiler.
#[derive(Debug, Clone)]
pub struct ManualClock {
    nanos: Rc<Cell<u64>>,
    available: Rc<Cell<bool>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            nanos: Rc::new(Cell::new(0)),
            available: Rc::new(Cell::new(true)),
        }
    }

    pub fn advance(&self, nanos: u64) {
        self.nanos.set(self.nanos.get() + nanos);
    }

    pub fn set(&self, nanos: u64) {
        self.nanos.set(nanos);
    }

    pub fn elapsed(&self) -> u64 {
        self.nanos.get()
    }

    /// Make subsequent reads fail (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Option<Timestamp> {
        if self.available.get() {
            Some(Timestamp::from_nanos(self.nanos.get()))
        } else {
            None
        }
    }
}

/// Which system clock to time a run with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    #[default]
    Monotonic,
    Realtime,
}

impl ClockSource {
    pub fn build(self) -> SystemClock {
        match self {
            ClockSource::Monotonic => SystemClock::Monotonic(MonotonicClock::new()),
            ClockSource::Realtime => SystemClock::Realtime(RealtimeClock),
        }
    }
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockSource::Monotonic => f.write_str("monotonic"),
            ClockSource::Realtime => f.write_str("realtime"),
        }
    }
}

impl FromStr for ClockSource {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monotonic" => Ok(ClockSource::Monotonic),
            "realtime" => Ok(ClockSource::Realtime),
            other => Err(ConfigError::UnknownValue {
                field: "clock",
                value: other.to_string(),
            }),
        }
    }
}

/// Clock chosen at run time from a [`ClockSource`].
#[derive(Debug, Clone, Copy)]
pub enum SystemClock {
    Monotonic(MonotonicClock),
    Realtime(RealtimeClock),
}

impl Clock for SystemClock {
    fn now(&self) -> Option<Timestamp> {
        match self {
            SystemClock::Monotonic(clock) => clock.now(),
            SystemClock::Realtime(clock) => clock.now(),
        }
    }
}


//=====================================================
// End of file
//=====================================================
