//! Harness error taxonomy.
//!
//! Every failure is raised synchronously inside the failing scenario;
//! scenarios are independent and one failure never affects another.

use strobe_sim::{SimError, SimTime};

use crate::config::ConfigError;

/// Errors a conformance scenario can report.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A recovered word differs from the word sent at the same aligned
    /// index.
    #[error("echo mismatch at transfer {index}: sent {sent:#04x}, recovered {recovered:#04x}")]
    EchoMismatch {
        /// Aligned transfer index of the first mismatch.
        index: usize,
        /// The payload value that was sent.
        sent: u8,
        /// The payload value that came back.
        recovered: u8,
    },

    /// The recovered log does not hold one stale word plus one echo per
    /// transfer.
    #[error("recovered log holds {actual} words, expected {expected}")]
    RecoveredLength {
        /// Expected length: transfers plus the stale lead.
        expected: usize,
        /// Observed length.
        actual: usize,
    },

    /// The device asserted ingress readiness while reset was held or the
    /// clock was lost.
    #[error("{check} check: ingress readiness asserted at {time}")]
    ReadinessAsserted {
        /// Which gating check observed the violation.
        check: &'static str,
        /// When it was observed.
        time: SimTime,
    },

    /// A failure in the underlying simulation fabric, including the
    /// run-level timeout that bounds protocol hangs.
    #[error("simulation error: {0}")]
    Sim(#[from] SimError),

    /// An invalid harness configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_mismatch_display() {
        let e = HarnessError::EchoMismatch {
            index: 7,
            sent: 0x07,
            recovered: 0xFE,
        };
        assert_eq!(
            e.to_string(),
            "echo mismatch at transfer 7: sent 0x07, recovered 0xfe"
        );
    }

    #[test]
    fn recovered_length_display() {
        let e = HarnessError::RecoveredLength {
            expected: 257,
            actual: 256,
        };
        assert_eq!(e.to_string(), "recovered log holds 256 words, expected 257");
    }

    #[test]
    fn readiness_display() {
        let e = HarnessError::ReadinessAsserted {
            check: "reset-held",
            time: SimTime::from_ns(10),
        };
        assert_eq!(
            e.to_string(),
            "reset-held check: ingress readiness asserted at 10 ns"
        );
    }

    #[test]
    fn sim_error_wraps() {
        let e: HarnessError = SimError::TimeLimitExceeded { limit_fs: 5 }.into();
        assert!(e.to_string().starts_with("simulation error:"));
    }

    #[test]
    fn config_error_wraps() {
        let e: HarnessError = ConfigError::InvalidBusWidth(12).into();
        assert!(e.to_string().starts_with("configuration error:"));
    }
}
