//! Readiness gating checks, independent of the transfer loop.
//!
//! A well-behaved device must never advertise ingress readiness while it
//! cannot actually accept data: both with reset held and with the clock
//! lost, the ready output has to read low after a short settle. The second
//! check exists because a device deriving readiness combinationally from
//! state insensitive to clock activity would pass the first and fail the
//! second.

use strobe_sim::{AgentId, ClockGen, Kernel, FS_PER_NS};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::pins::BridgePins;

/// Settle delay of the reset-held check, in nanoseconds.
const RESET_HELD_SETTLE_NS: u64 = 10;
/// Settle delay of the no-clock check, in nanoseconds.
const NO_CLOCK_SETTLE_NS: u64 = 5;

/// With the clock running, reset asserted, and egress ready deasserted,
/// the ingress ready must read low after a short settle.
pub fn check_reset_held<F>(config: &HarnessConfig, install_device: F) -> Result<(), HarnessError>
where
    F: FnOnce(&mut Kernel, &BridgePins, &HarnessConfig) -> AgentId,
{
    config.validate()?;
    let mut kernel = Kernel::new();
    kernel.set_time_limit(config.time_limit_fs());
    let pins = BridgePins::create(&mut kernel, config.bus_width);
    let _device = install_device(&mut kernel, &pins, config);
    kernel.drive_bit(pins.m_tready, false);
    kernel.drive_bit(pins.arstn, false);
    ClockGen::start(&mut kernel, pins.aclk, config.clock_period_fs())?;
    kernel.run_for(RESET_HELD_SETTLE_NS * FS_PER_NS)?;
    if kernel.peek_bit(pins.s_tready) {
        return Err(HarnessError::ReadinessAsserted {
            check: "reset-held",
            time: kernel.now(),
        });
    }
    Ok(())
}

/// With the clock line held static and reset asserted, the ingress ready
/// must read low after a short settle.
pub fn check_no_clock<F>(config: &HarnessConfig, install_device: F) -> Result<(), HarnessError>
where
    F: FnOnce(&mut Kernel, &BridgePins, &HarnessConfig) -> AgentId,
{
    config.validate()?;
    let mut kernel = Kernel::new();
    kernel.set_time_limit(config.time_limit_fs());
    let pins = BridgePins::create(&mut kernel, config.bus_width);
    let _device = install_device(&mut kernel, &pins, config);
    kernel.drive_bit(pins.m_tready, false);
    kernel.drive_bit(pins.arstn, false);
    // No clock is started: the line never toggles.
    kernel.run_for(NO_CLOCK_SETTLE_NS * FS_PER_NS)?;
    if kernel.peek_bit(pins.s_tready) {
        return Err(HarnessError::ReadinessAsserted {
            check: "no-clock",
            time: kernel.now(),
        });
    }
    Ok(())
}
