//! Scenario driver: one clock mode, one data pattern, one verdict.
//!
//! A [`Scenario`] owns the whole life of a run: it builds the timeline,
//! installs the device model and the harness components against the same
//! link, sequences reset, pumps the pattern through send/receive pairs,
//! issues the single flush transfer, and hands both logs to the oracle.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use strobe_sim::{hold_reset, AgentId, ClockGen, Kernel, SimTime, VcdRecorder};

use crate::config::{ClockMode, HarnessConfig, LinkParams};
use crate::error::HarnessError;
use crate::frame::{Frame, TransferLog};
use crate::oracle;
use crate::pins::BridgePins;
use crate::spi::SpiLoopback;
use crate::stream::{StreamSink, StreamSource};

/// Payload value of the flush transfer that retires the last word still
/// held inside the device pipeline.
pub const FLUSH_VALUE: u8 = 0;

/// The data pattern driven through one scenario, one byte per transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// The same value repeated a fixed number of times.
    Constant {
        /// The repeated payload value.
        value: u8,
        /// Number of transfers.
        count: usize,
    },
    /// Every byte value once, 0 through 255 in order.
    Incrementing,
    /// An explicit byte sequence.
    Explicit(Vec<u8>),
}

impl Pattern {
    /// The canonical constant-fill pattern: 0xFE, 256 repetitions.
    pub fn constant_fill() -> Self {
        Pattern::Constant {
            value: 0xFE,
            count: 256,
        }
    }

    /// Materializes the pattern as a byte sequence.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Pattern::Constant { value, count } => vec![*value; *count],
            Pattern::Incrementing => (0..=255).collect(),
            Pattern::Explicit(bytes) => bytes.clone(),
        }
    }

    /// Number of transfers in the pattern.
    pub fn len(&self) -> usize {
        match self {
            Pattern::Constant { count, .. } => *count,
            Pattern::Incrementing => 256,
            Pattern::Explicit(bytes) => bytes.len(),
        }
    }

    /// Whether the pattern carries no transfers at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The structured outcome of a completed scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// The per-run transfer logs, stale lead still in place.
    pub log: TransferLog,
    /// Number of pattern transfers submitted (the flush not included).
    pub transfers: usize,
    /// Simulation time when the run ended.
    pub final_time: SimTime,
}

/// One parameterized conformance run.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// The clock polarity/phase pairing under test.
    pub mode: ClockMode,
    /// The data pattern to drive.
    pub pattern: Pattern,
    /// Link and timing parameters.
    pub config: HarnessConfig,
    waveform: Option<PathBuf>,
}

impl Scenario {
    /// Creates a scenario.
    pub fn new(mode: ClockMode, pattern: Pattern, config: HarnessConfig) -> Self {
        Self {
            mode,
            pattern,
            config,
            waveform: None,
        }
    }

    /// Records a VCD trace of every net to `path` during the run.
    pub fn with_waveform(mut self, path: impl Into<PathBuf>) -> Self {
        self.waveform = Some(path.into());
        self
    }

    /// Builds the timeline: pins, device, peer, producer, consumer,
    /// configuration inputs, clock, and the reset/settle sequence.
    fn bring_up<F>(
        &self,
        install_device: F,
    ) -> Result<(Kernel, BridgePins, StreamSource, StreamSink), HarnessError>
    where
        F: FnOnce(&mut Kernel, &BridgePins, &HarnessConfig) -> AgentId,
    {
        self.config.validate()?;
        let mut kernel = Kernel::new();
        kernel.set_time_limit(self.config.time_limit_fs());
        let pins = BridgePins::create(&mut kernel, self.config.bus_width);
        let _device = install_device(&mut kernel, &pins, &self.config);
        let link = LinkParams::from_config(&self.config);
        SpiLoopback::install(
            &mut kernel,
            pins.sclk,
            pins.copi,
            pins.cipo,
            pins.csn,
            &link,
            self.mode,
        );
        let source = StreamSource::install(&mut kernel, &pins);
        let sink = StreamSink::install(&mut kernel, &pins, self.config.bus_width);

        kernel.drive_bit(pins.cpol, self.mode.cpol());
        kernel.drive_bit(pins.cpha, self.mode.cpha());
        kernel.drive(pins.rate_div, self.config.rate_divisor());

        if let Some(path) = &self.waveform {
            let writer = BufWriter::new(File::create(path).map_err(strobe_sim::SimError::from)?);
            kernel.attach_recorder(Box::new(VcdRecorder::new(writer)))?;
        }

        ClockGen::start(&mut kernel, pins.aclk, self.config.clock_period_fs())?;
        hold_reset(&mut kernel, pins.arstn, self.config.reset_hold_fs())?;
        kernel.run_for(self.config.settle_fs())?;
        Ok((kernel, pins, source, sink))
    }

    /// Runs the full send/receive loop, the flush transfer, and the
    /// oracle.
    ///
    /// `install_device` places the device model under test onto the pins;
    /// the harness owns everything else on the link.
    pub fn run<F>(&self, install_device: F) -> Result<ScenarioReport, HarnessError>
    where
        F: FnOnce(&mut Kernel, &BridgePins, &HarnessConfig) -> AgentId,
    {
        let (mut kernel, _pins, source, sink) = self.bring_up(install_device)?;
        let mut log = TransferLog::new();
        for value in self.pattern.bytes() {
            source.send(&mut kernel, Frame::fill(value, self.config.bus_width))?;
            log.sent.push(value);
            let data = sink.recv(&mut kernel)?;
            log.recovered.push(data.first().copied().unwrap_or(0));
        }

        // Exactly one flush transfer retires the word still inside the
        // device pipeline; its payload is not logged as sent.
        source.send(&mut kernel, Frame::fill(FLUSH_VALUE, self.config.bus_width))?;
        let data = sink.recv(&mut kernel)?;
        log.recovered.push(data.first().copied().unwrap_or(0));

        kernel.finalize_waveform()?;
        oracle::verify(&log.sent, &log.recovered)?;
        Ok(ScenarioReport {
            transfers: log.sent.len(),
            final_time: kernel.now(),
            log,
        })
    }

    /// The submit-only variant: every pattern frame is sent and its
    /// acceptance awaited, but the egress side is left accumulating in the
    /// consumer and no comparison is applied. Proves ingress throughput
    /// only.
    pub fn run_stream_only<F>(&self, install_device: F) -> Result<ScenarioReport, HarnessError>
    where
        F: FnOnce(&mut Kernel, &BridgePins, &HarnessConfig) -> AgentId,
    {
        let (mut kernel, _pins, source, _sink) = self.bring_up(install_device)?;
        let mut log = TransferLog::new();
        for value in self.pattern.bytes() {
            source.send(&mut kernel, Frame::fill(value, self.config.bus_width))?;
            log.sent.push(value);
        }
        kernel.finalize_waveform()?;
        Ok(ScenarioReport {
            transfers: log.sent.len(),
            final_time: kernel.now(),
            log,
        })
    }
}
