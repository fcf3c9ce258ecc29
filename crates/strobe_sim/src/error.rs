//! Error types for the co-simulation fabric.

use crate::time::SimTime;

/// Errors that can occur while building or running a timeline.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The event queue drained while a wait was still unsatisfied.
    ///
    /// With no clock or timer left to fire, the blocked wait can never
    /// complete.
    #[error("timeline stalled at {at}: no pending events while a wait is unsatisfied")]
    Stalled {
        /// The time at which the queue drained.
        at: SimTime,
    },

    /// The run-level time limit elapsed before the current wait completed.
    ///
    /// This is the only escape from a protocol hang; the fabric performs
    /// no other deadlock detection.
    #[error("run time limit exceeded: {limit_fs} fs")]
    TimeLimitExceeded {
        /// The configured limit in femtoseconds.
        limit_fs: u64,
    },

    /// Too many delta steps at a single instant, indicating a feedback
    /// loop between agents.
    #[error("delta limit exceeded at {fs} fs (max {max_deltas} deltas)")]
    DeltaLimit {
        /// The instant where the limit was hit.
        fs: u64,
        /// The maximum number of delta steps allowed per instant.
        max_deltas: u32,
    },

    /// A clock period too short to produce two distinct edges.
    #[error("clock period of {period_fs} fs cannot be halved into edges")]
    PeriodTooShort {
        /// The offending period in femtoseconds.
        period_fs: u64,
    },

    /// An I/O error while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stalled_display() {
        let e = SimError::Stalled {
            at: SimTime::from_ns(5),
        };
        assert_eq!(
            e.to_string(),
            "timeline stalled at 5 ns: no pending events while a wait is unsatisfied"
        );
    }

    #[test]
    fn time_limit_display() {
        let e = SimError::TimeLimitExceeded { limit_fs: 1_000 };
        assert_eq!(e.to_string(), "run time limit exceeded: 1000 fs");
    }

    #[test]
    fn delta_limit_display() {
        let e = SimError::DeltaLimit {
            fs: 100,
            max_deltas: 1000,
        };
        assert_eq!(e.to_string(), "delta limit exceeded at 100 fs (max 1000 deltas)");
    }

    #[test]
    fn period_too_short_display() {
        let e = SimError::PeriodTooShort { period_fs: 1 };
        assert_eq!(e.to_string(), "clock period of 1 fs cannot be halved into edges");
    }

    #[test]
    fn waveform_io_display() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e = SimError::WaveformIo(io);
        assert!(e.to_string().starts_with("waveform I/O error:"));
    }
}
