//! Simulation time with femtosecond precision and delta steps.
//!
//! [`SimTime`] carries both the wall-clock simulation time (in femtoseconds)
//! and a delta index that orders same-instant propagation steps, so that a
//! value driven in response to an edge never races the edge itself.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;

/// A point on the simulation timeline.
///
/// Ordered first by femtosecond timestamp, then by delta index. Delta steps
/// are instantaneous: they separate cause (an applied net change) from
/// effect (the values agents drive in response) within one wall-clock
/// instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Wall-clock simulation time in femtoseconds.
    pub fs: u64,
    /// Delta index within the current instant.
    pub delta: u32,
}

impl SimTime {
    /// The origin of the timeline: time zero, delta zero.
    pub const ZERO: SimTime = SimTime { fs: 0, delta: 0 };

    /// Creates a time from a femtosecond value with delta 0.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs, delta: 0 }
    }

    /// Creates a time from a nanosecond value with delta 0.
    pub fn from_ns(ns: u64) -> Self {
        Self {
            fs: ns * FS_PER_NS,
            delta: 0,
        }
    }

    /// Creates a time from a microsecond value with delta 0.
    pub fn from_us(us: u64) -> Self {
        Self {
            fs: us * FS_PER_US,
            delta: 0,
        }
    }

    /// Returns the next delta step at the same wall-clock instant.
    pub fn next_delta(&self) -> Self {
        Self {
            fs: self.fs,
            delta: self.delta + 1,
        }
    }

    /// Returns the time `dur_fs` femtoseconds later, at delta 0.
    pub fn after(&self, dur_fs: u64) -> Self {
        Self {
            fs: self.fs + dur_fs,
            delta: 0,
        }
    }

    /// Converts the femtosecond timestamp to nanoseconds (truncated).
    pub fn to_ns(&self) -> u64 {
        self.fs / FS_PER_NS
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.fs;
        if fs == 0 {
            write!(f, "0 fs")?;
        } else if fs % FS_PER_US == 0 {
            write!(f, "{} us", fs / FS_PER_US)?;
        } else if fs % FS_PER_NS == 0 {
            write!(f, "{} ns", fs / FS_PER_NS)?;
        } else {
            write!(f, "{fs} fs")?;
        }
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_origin() {
        assert_eq!(SimTime::ZERO.fs, 0);
        assert_eq!(SimTime::ZERO.delta, 0);
        assert_eq!(SimTime::default(), SimTime::ZERO);
    }

    #[test]
    fn from_ns_scales() {
        let t = SimTime::from_ns(10);
        assert_eq!(t.fs, 10_000_000);
        assert_eq!(t.delta, 0);
    }

    #[test]
    fn from_us_scales() {
        assert_eq!(SimTime::from_us(3).fs, 3_000_000_000);
    }

    #[test]
    fn next_delta_keeps_instant() {
        let t = SimTime::from_ns(5);
        let d = t.next_delta();
        assert_eq!(d.fs, t.fs);
        assert_eq!(d.delta, 1);
        assert_eq!(d.next_delta().delta, 2);
    }

    #[test]
    fn after_resets_delta() {
        let t = SimTime { fs: 100, delta: 7 };
        let u = t.after(50);
        assert_eq!(u.fs, 150);
        assert_eq!(u.delta, 0);
    }

    #[test]
    fn to_ns_truncates() {
        assert_eq!(SimTime::from_ns(42).to_ns(), 42);
        assert_eq!(SimTime::from_fs(1_500_000).to_ns(), 1);
    }

    #[test]
    fn ordering_by_fs_then_delta() {
        let a = SimTime::from_ns(1);
        let b = SimTime::from_ns(2);
        assert!(a < b);
        let c = SimTime { fs: 100, delta: 0 };
        let d = SimTime { fs: 100, delta: 1 };
        assert!(c < d);
        let e = SimTime { fs: 200, delta: 0 };
        let f = SimTime { fs: 100, delta: 99 };
        assert!(e > f);
    }

    #[test]
    fn display_units() {
        assert_eq!(SimTime::ZERO.to_string(), "0 fs");
        assert_eq!(SimTime::from_ns(10).to_string(), "10 ns");
        assert_eq!(SimTime::from_us(5).to_string(), "5 us");
        assert_eq!(SimTime::from_fs(1500).to_string(), "1500 fs");
    }

    #[test]
    fn display_with_delta() {
        let t = SimTime {
            fs: FS_PER_NS,
            delta: 3,
        };
        assert_eq!(t.to_string(), "1 ns+d3");
    }

    #[test]
    fn serde_roundtrip() {
        let t = SimTime {
            fs: 12345,
            delta: 7,
        };
        let json = serde_json::to_string(&t).unwrap();
        let back: SimTime = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
