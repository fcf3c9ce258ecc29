//! The comparison oracle aligning sent and recovered sequences.

use crate::error::HarnessError;

/// Number of stale words at the head of every recovered sequence.
///
/// The loopback peer echoes the *previously completed* word, so its first
/// emitted word predates any real data: it is the content of the peer's
/// register at reset, not a valid echo. Alignment always discards exactly
/// this many leading recovered elements — the trim is this invariant, not
/// an arbitrary index adjustment.
pub const STALE_LEAD_WORDS: usize = 1;

/// Verifies that `recovered`, after discarding the [`STALE_LEAD_WORDS`]
/// stale lead, equals `sent` element for element.
///
/// Reports the first mismatching index with both values and stops there;
/// later mismatches are discoverable by rerunning the scenario, which is
/// pattern-isolated.
pub fn verify(sent: &[u8], recovered: &[u8]) -> Result<(), HarnessError> {
    let expected = sent.len() + STALE_LEAD_WORDS;
    if recovered.len() != expected {
        return Err(HarnessError::RecoveredLength {
            expected,
            actual: recovered.len(),
        });
    }
    let echoed = &recovered[STALE_LEAD_WORDS..];
    for (index, (s, r)) in sent.iter().zip(echoed).enumerate() {
        if s != r {
            return Err(HarnessError::EchoMismatch {
                index,
                sent: *s,
                recovered: *r,
            });
        }
    }
    Ok(())
}
