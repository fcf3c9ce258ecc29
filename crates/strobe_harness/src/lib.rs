//! Streaming-loopback conformance harness for stream-to-SPI bridge cores.
//!
//! The harness drives a byte-stream-to-SPI bridge through all four SPI
//! clock polarity/phase pairings over a simulated link, verifies bit-exact
//! echo of everything sent through a loopback peer on the SPI side, and
//! verifies that the device gates its ingress readiness during reset and
//! clock loss.
//!
//! The device itself is an external collaborator: callers install a model
//! of it onto the [`pins::BridgePins`] boundary, and the harness owns every
//! other driver on the link — clock, reset, stream producer and consumer,
//! and the SPI loopback peer. A [`scenario::Scenario`] sequences one run
//! end to end; the [`oracle`] applies the alignment rule that discards the
//! loopback peer's stale leading word before comparing.
//!
//! # Modules
//!
//! - `config` — Frequencies, clock modes, link parameters, TOML loading
//! - `pins` — The signal-level device boundary
//! - `frame` — Stream frames and transfer logs
//! - `spi` — The SPI loopback peer
//! - `stream` — Stream producer and consumer
//! - `scenario` — Scenario driver and reports
//! - `oracle` — Sent/recovered comparison
//! - `readiness` — Reset and clock-loss gating checks
//! - `error` — Harness error taxonomy

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod frame;
pub mod oracle;
pub mod pins;
pub mod readiness;
pub mod scenario;
pub mod spi;
pub mod stream;

pub use config::{ClockMode, ConfigError, Frequency, HarnessConfig, LinkParams};
pub use error::HarnessError;
pub use frame::{Frame, TransferLog};
pub use oracle::{verify, STALE_LEAD_WORDS};
pub use pins::BridgePins;
pub use readiness::{check_no_clock, check_reset_held};
pub use scenario::{Pattern, Scenario, ScenarioReport, FLUSH_VALUE};
pub use spi::SpiLoopback;
pub use stream::{StreamSink, StreamSource};
