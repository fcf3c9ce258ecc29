//! Periodic clock generation and reset sequencing.
//!
//! [`ClockGen`] toggles a net forever at a fixed period; [`hold_reset`]
//! drives an active-low reset net through its assert/hold/release sequence.
//! Together they are the timing authority every other agent synchronizes to,
//! so the clock must be started before any component performs a timed wait.

use crate::error::SimError;
use crate::kernel::{Agent, AgentId, Cause, Kernel, SimCtx};
use crate::net::NetId;

/// Free-running clock source for one net.
///
/// The net starts at its allocated level; the first toggle lands half a
/// period after [`start`](ClockGen::start) is called, and toggles repeat
/// unboundedly from there.
pub struct ClockGen {
    net: NetId,
    half_period_fs: u64,
}

impl ClockGen {
    /// Registers a clock on `net` and schedules its first toggle.
    ///
    /// Fails with [`SimError::PeriodTooShort`] if the period cannot be
    /// split into two half-periods of at least one femtosecond.
    pub fn start(kernel: &mut Kernel, net: NetId, period_fs: u64) -> Result<AgentId, SimError> {
        let half_period_fs = period_fs / 2;
        if half_period_fs == 0 {
            return Err(SimError::PeriodTooShort { period_fs });
        }
        let id = kernel.add_agent(Box::new(ClockGen {
            net,
            half_period_fs,
        }));
        kernel.wake_at(id, kernel.now().after(half_period_fs));
        Ok(id)
    }
}

impl Agent for ClockGen {
    fn name(&self) -> &str {
        "clock"
    }

    fn wake(&mut self, _cause: Cause, ctx: &mut SimCtx<'_>) -> Result<(), SimError> {
        let level = ctx.read_bit(self.net);
        ctx.drive_bit(self.net, !level);
        ctx.wake_in(self.half_period_fs);
        Ok(())
    }
}

/// Drives an active-low reset: asserts `rstn`, holds it for `hold_fs`,
/// then releases it.
///
/// The hold must span several clock periods so that every synchronizer
/// stage inside the device observes the assertion. The device's ingress
/// readiness must stay deasserted until the release.
pub fn hold_reset(kernel: &mut Kernel, rstn: NetId, hold_fs: u64) -> Result<(), SimError> {
    kernel.drive_bit(rstn, false);
    kernel.run_for(hold_fs)?;
    kernel.drive_bit(rstn, true);
    // Apply the release before returning so callers observe it.
    kernel.run_for(0)?;
    Ok(())
}
