//! Shared test fixture: a behavioral model of the stream-to-SPI bridge.
//!
//! The harness treats the device as an external collaborator, so the
//! integration tests stand one in: [`ReferenceBridge`] implements the
//! device contract — a valid/ready ingress, a divisor-timed SPI controller
//! honoring all four clock modes, a one-word pipeline, and a valid/ready
//! egress carrying each transaction's received word.

use strobe_harness::{BridgePins, HarnessConfig};
use strobe_sim::{Agent, AgentId, Cause, Edge, Kernel, SimCtx, SimError};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum BridgeState {
    /// Accepting an ingress word.
    Ready,
    /// Shifting a word across the SPI link.
    Transfer,
    /// Holding select for half a bit period after the final edge.
    Deselect,
    /// Presenting the received word on the egress.
    Emit,
}

/// Behavioral model of the bridge under test.
///
/// Entirely clocked by the system clock's rising edge; reset is sampled
/// synchronously and forces every output low (select and clock to their
/// idle levels), which also gates ingress readiness as the conformance
/// checks require.
pub struct ReferenceBridge {
    pins: BridgePins,
    word_width: u32,
    state: BridgeState,
    /// Word being shifted out to the peripheral.
    tx: u64,
    /// Word being shifted in from the peripheral.
    rx: u64,
    /// System clock edges since the last SPI clock toggle.
    tick: u64,
    /// SPI clock edges produced this transaction.
    edges: u32,
    out_idx: u32,
}

impl ReferenceBridge {
    /// Installs the model onto the pins.
    pub fn install(kernel: &mut Kernel, pins: &BridgePins, config: &HarnessConfig) -> AgentId {
        let agent = kernel.add_agent(Box::new(ReferenceBridge {
            pins: *pins,
            word_width: config.word_width(),
            state: BridgeState::Ready,
            tx: 0,
            rx: 0,
            tick: 0,
            edges: 0,
            out_idx: 0,
        }));
        kernel.watch(agent, pins.aclk, Edge::Rising);
        agent
    }

    fn shift_out(&mut self, ctx: &mut SimCtx<'_>) {
        let bit = (self.tx >> (self.word_width - 1 - self.out_idx)) & 1 != 0;
        ctx.drive_bit(self.pins.copi, bit);
        self.out_idx += 1;
    }

    fn sample_in(&mut self, ctx: &SimCtx<'_>) {
        self.rx = (self.rx << 1) | ctx.read_bit(self.pins.cipo) as u64;
    }
}

impl Agent for ReferenceBridge {
    fn name(&self) -> &str {
        "reference_bridge"
    }

    fn wake(&mut self, _cause: Cause, ctx: &mut SimCtx<'_>) -> Result<(), SimError> {
        let p = self.pins;
        let cpol = ctx.read_bit(p.cpol);

        if !ctx.read_bit(p.arstn) {
            ctx.drive_bit(p.s_tready, false);
            ctx.drive_bit(p.m_tvalid, false);
            ctx.drive_bit(p.csn, true);
            ctx.drive_bit(p.sclk, cpol);
            ctx.drive_bit(p.copi, false);
            self.state = BridgeState::Ready;
            self.tick = 0;
            self.edges = 0;
            return Ok(());
        }

        let half_ticks = ctx.read(p.rate_div).max(1);
        match self.state {
            BridgeState::Ready => {
                if ctx.read_bit(p.s_tvalid) && ctx.read_bit(p.s_tready) {
                    self.tx = ctx.read(p.s_tdata);
                    self.rx = 0;
                    self.tick = 0;
                    self.edges = 0;
                    self.out_idx = 0;
                    ctx.drive_bit(p.s_tready, false);
                    ctx.drive_bit(p.csn, false);
                    if !ctx.read_bit(p.cpha) {
                        // phase 0 puts the first bit out at select time
                        self.shift_out(ctx);
                    }
                    self.state = BridgeState::Transfer;
                } else if !ctx.read_bit(p.s_tready) {
                    ctx.drive_bit(p.s_tready, true);
                }
            }
            BridgeState::Transfer => {
                self.tick += 1;
                if self.tick < half_ticks {
                    return Ok(());
                }
                self.tick = 0;
                self.edges += 1;
                let leading = self.edges % 2 == 1;
                ctx.drive_bit(p.sclk, leading != cpol);
                if !ctx.read_bit(p.cpha) {
                    if leading {
                        self.sample_in(ctx);
                    } else if self.out_idx < self.word_width {
                        self.shift_out(ctx);
                    }
                } else if leading {
                    self.shift_out(ctx);
                } else {
                    self.sample_in(ctx);
                }
                if self.edges == 2 * self.word_width {
                    // hold select through the peripheral's final edge work
                    self.state = BridgeState::Deselect;
                }
            }
            BridgeState::Deselect => {
                self.tick += 1;
                if self.tick < half_ticks {
                    return Ok(());
                }
                self.tick = 0;
                ctx.drive_bit(p.csn, true);
                ctx.drive(p.m_tdata, self.rx);
                ctx.drive_bit(p.m_tvalid, true);
                self.state = BridgeState::Emit;
            }
            BridgeState::Emit => {
                if ctx.read_bit(p.m_tvalid) && ctx.read_bit(p.m_tready) {
                    ctx.drive_bit(p.m_tvalid, false);
                    ctx.drive_bit(p.s_tready, true);
                    self.state = BridgeState::Ready;
                }
            }
        }
        Ok(())
    }
}
