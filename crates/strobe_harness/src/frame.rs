//! Stream frames and per-scenario transfer logs.

use strobe_sim::EventFlag;

/// One ingress stream frame: a word of `bus_width` bytes, every byte equal
/// to the same payload value, plus a completion signal that fires exactly
/// once when the device has accepted the frame.
///
/// Clones share the completion flag.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The payload bytes, most-significant byte first on the wire.
    pub data: Vec<u8>,
    /// Fires once, when the frame has been fully accepted at the ingress.
    pub accepted: EventFlag,
}

impl Frame {
    /// Builds a frame of `bus_width` bytes all equal to `value`.
    pub fn fill(value: u8, bus_width: usize) -> Self {
        Self {
            data: vec![value; bus_width],
            accepted: EventFlag::new(),
        }
    }

    /// Packs the bytes into a word, `data[0]` in the most significant
    /// position.
    pub fn word(&self) -> u64 {
        self.data.iter().fold(0u64, |w, &b| (w << 8) | u64::from(b))
    }

    /// The payload value this frame carries.
    pub fn payload_byte(&self) -> u8 {
        self.data.first().copied().unwrap_or(0)
    }
}

/// Unpacks a word into `bus_width` bytes, most significant first.
pub fn word_to_bytes(word: u64, bus_width: usize) -> Vec<u8> {
    (0..bus_width)
        .map(|i| (word >> (8 * (bus_width - 1 - i))) as u8)
        .collect()
}

/// The two ordered transfer logs of one scenario run.
///
/// Owned by the scenario, never shared across runs: `sent` holds the
/// payload values in submission order, `recovered` the values collected
/// from the egress in arrival order.
#[derive(Debug, Clone, Default)]
pub struct TransferLog {
    /// Payload values fed to the producer, in submission order.
    pub sent: Vec<u8>,
    /// Payload values collected from the consumer, in arrival order.
    pub recovered: Vec<u8>,
}

impl TransferLog {
    /// Creates an empty log pair.
    pub fn new() -> Self {
        Self::default()
    }
}
