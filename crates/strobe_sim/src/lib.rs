//! Discrete-event co-simulation fabric for the strobe conformance harness.
//!
//! This crate provides the shared timeline that the harness components and
//! an externally-supplied device model cooperate on: femtosecond time with
//! delta steps, named nets with edge-sensitive agent wakeup, single-fire
//! completion flags, periodic clock generation with reset sequencing, and
//! optional VCD waveform capture.
//!
//! # Scheduling model
//!
//! Everything runs single-threaded on one event queue. Agents suspend only
//! at explicit wait conditions — a subscribed edge or a self-scheduled
//! timer — and all agents woken at one instant observe the same post-edge
//! net values, with their own drives applied one delta step later. The
//! calling test advances the timeline from outside with
//! [`Kernel::run_for`] / [`Kernel::run_until`]; a run-level time limit is
//! the only escape from a wait that never completes.
//!
//! # Modules
//!
//! - `time` — Femtosecond-precision time with delta steps
//! - `net` — Named nets and edge classification
//! - `sync` — Single-fire completion flags
//! - `kernel` — Event queue, agents, run control
//! - `clock` — Clock generation and reset sequencing
//! - `waveform` — Waveform recording (VCD format)
//! - `error` — Fabric error types

#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod kernel;
pub mod net;
pub mod sync;
pub mod time;
pub mod waveform;

pub use clock::{hold_reset, ClockGen};
pub use error::SimError;
pub use kernel::{Agent, AgentId, Cause, Kernel, SimCtx};
pub use net::{edge_between, Edge, NetId};
pub use sync::EventFlag;
pub use time::{SimTime, FS_PER_NS, FS_PER_US};
pub use waveform::{VcdRecorder, WaveformRecorder};
