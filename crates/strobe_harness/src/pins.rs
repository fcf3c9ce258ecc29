//! The signal-level boundary to the device under test.
//!
//! [`BridgePins`] allocates every net the device model connects to. Each
//! wire direction has exactly one driver: the harness drives the clock,
//! reset, ingress valid side, egress ready side, and configuration inputs;
//! the loopback peer drives `cipo`; the device drives everything else.

use strobe_sim::{Kernel, NetId};

/// Handles for all nets at the device boundary.
#[derive(Clone, Copy, Debug)]
pub struct BridgePins {
    /// System clock input.
    pub aclk: NetId,
    /// Active-low asynchronous reset input.
    pub arstn: NetId,
    /// Ingress stream payload (bus width × 8 bits), driven by the producer.
    pub s_tdata: NetId,
    /// Ingress stream valid, driven by the producer.
    pub s_tvalid: NetId,
    /// Ingress stream ready, driven by the device.
    pub s_tready: NetId,
    /// Egress stream payload, driven by the device.
    pub m_tdata: NetId,
    /// Egress stream valid, driven by the device.
    pub m_tvalid: NetId,
    /// Egress stream ready, driven by the consumer.
    pub m_tready: NetId,
    /// SPI clock line, driven by the device.
    pub sclk: NetId,
    /// Controller-out/peripheral-in data line, driven by the device.
    pub copi: NetId,
    /// Controller-in/peripheral-out data line, driven by the peer.
    pub cipo: NetId,
    /// Chip select, active low, driven by the device.
    pub csn: NetId,
    /// Clock polarity configuration input.
    pub cpol: NetId,
    /// Clock phase configuration input.
    pub cpha: NetId,
    /// Clock divisor register value (system clock cycles per SPI half-bit).
    pub rate_div: NetId,
}

impl BridgePins {
    /// Allocates the full pin set on a kernel. Chip select and reset start
    /// deasserted; everything else starts low.
    pub fn create(kernel: &mut Kernel, bus_width: usize) -> Self {
        let data_width = (bus_width * 8) as u32;
        Self {
            aclk: kernel.net("aclk", 1),
            arstn: kernel.net_with("arstn", 1, 1),
            s_tdata: kernel.net("s_tdata", data_width),
            s_tvalid: kernel.net("s_tvalid", 1),
            s_tready: kernel.net("s_tready", 1),
            m_tdata: kernel.net("m_tdata", data_width),
            m_tvalid: kernel.net("m_tvalid", 1),
            m_tready: kernel.net("m_tready", 1),
            sclk: kernel.net("sclk", 1),
            copi: kernel.net("copi", 1),
            cipo: kernel.net("cipo", 1),
            csn: kernel.net_with("csn", 1, 1),
            cpol: kernel.net("cpol", 1),
            cpha: kernel.net("cpha", 1),
            rate_div: kernel.net("rate_div", 32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_and_reset_start_deasserted() {
        let mut kernel = Kernel::new();
        let pins = BridgePins::create(&mut kernel, 1);
        assert!(kernel.peek_bit(pins.csn));
        assert!(kernel.peek_bit(pins.arstn));
        assert!(!kernel.peek_bit(pins.s_tready));
        assert!(!kernel.peek_bit(pins.aclk));
    }

    #[test]
    fn data_nets_track_bus_width() {
        let mut kernel = Kernel::new();
        let pins = BridgePins::create(&mut kernel, 2);
        kernel.drive(pins.s_tdata, 0x1_FFFF);
        kernel.run_for(1).unwrap();
        // 16-bit payload masks the 17th bit away.
        assert_eq!(kernel.peek(pins.s_tdata), 0xFFFF);
    }
}
