//! Domain types providing compile-time safety and self-documentation
//!
//! Raw `u64` nanosecond values flow through the whole pipeline; these
//! newtypes keep "point in time" and "span of time" from being mixed up at
//! the display layer.

use std::fmt;

/// Timestamp in nanoseconds
///
/// An absolute point in time, nanoseconds since boot (the kernel's monotonic
/// clock). Approximately monotonic per task, not strictly monotonic across
/// CPUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Convert to seconds (f64)
    #[must_use]
    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_seconds())
    }
}

/// Duration in nanoseconds
///
/// A span of time such as a run slice or a wake->run latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Nanos(pub u64);

impl Nanos {
    /// Convert to milliseconds (f64)
    #[must_use]
    pub fn as_millis(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Convert to microseconds (u64)
    #[must_use]
    pub fn as_micros(self) -> u64 {
        self.0 / 1_000
    }
}

impl fmt::Display for Nanos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000_000_000 {
            write!(f, "{:.2}s", self.as_millis() / 1000.0)
        } else if self.0 >= 1_000_000 {
            write!(f, "{:.2}ms", self.as_millis())
        } else if self.0 >= 1_000 {
            write!(f, "{}us", self.as_micros())
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}
