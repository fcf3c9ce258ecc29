//! Discrete-event kernel with an edge-sensitive agent model.
//!
//! [`Kernel`] owns the nets, the event queue, and the registered agents.
//! Agents are woken by the edges they subscribed to or by self-scheduled
//! timer wakes; a woken agent reads nets at their post-edge values and
//! drives them at the next delta step, so every agent woken at one instant
//! observes the same pre-drive state.
//!
//! The calling test drives the timeline from outside via [`Kernel::run_for`]
//! and [`Kernel::run_until`]; a blocked wait only ends when its condition is
//! met, the queue drains, or the run-level time limit trips.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::SimError;
use crate::net::{edge_between, Edge, NetId, NetState};
use crate::sync::EventFlag;
use crate::time::SimTime;
use crate::waveform::WaveformRecorder;

/// Opaque handle for a registered agent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AgentId(u32);

impl AgentId {
    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Why an agent was woken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cause {
    /// A self-scheduled timer wake elapsed.
    Timer,
    /// A subscribed net changed. `edge` is the transition that occurred,
    /// never [`Edge::Any`].
    Edge {
        /// The net that changed.
        net: NetId,
        /// The observed transition.
        edge: Edge,
    },
}

/// A cooperatively-scheduled protocol engine on the timeline.
///
/// Implementations keep their own state machine and suspend only by
/// returning from [`wake`](Agent::wake); the next wake arrives at the next
/// subscribed edge or scheduled timer.
pub trait Agent {
    /// Name for diagnostics.
    fn name(&self) -> &str;

    /// Handles one wake. Net reads see post-edge values; drives issued
    /// through `ctx` apply at the next delta step.
    fn wake(&mut self, cause: Cause, ctx: &mut SimCtx<'_>) -> Result<(), SimError>;
}

/// The view an agent gets while it is running.
pub struct SimCtx<'a> {
    now: SimTime,
    nets: &'a [NetState],
    agent: AgentId,
    scheduled: Vec<(SimTime, Action)>,
}

impl SimCtx<'_> {
    /// The current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Reads a net's current value.
    pub fn read(&self, net: NetId) -> u64 {
        self.nets[net.as_raw() as usize].value
    }

    /// Reads bit 0 of a net.
    pub fn read_bit(&self, net: NetId) -> bool {
        self.nets[net.as_raw() as usize].bit()
    }

    /// Drives a net at the next delta step.
    pub fn drive(&mut self, net: NetId, value: u64) {
        self.scheduled
            .push((self.now.next_delta(), Action::Drive { net, value }));
    }

    /// Drives bit 0 of a net at the next delta step.
    pub fn drive_bit(&mut self, net: NetId, level: bool) {
        self.drive(net, level as u64);
    }

    /// Schedules a timer wake for this agent `dur_fs` femtoseconds from now.
    pub fn wake_in(&mut self, dur_fs: u64) {
        let agent = self.agent;
        self.scheduled
            .push((self.now.after(dur_fs), Action::Wake { agent }));
    }
}

/// A scheduled event payload.
#[derive(Debug, Clone)]
enum Action {
    /// Apply a new value to a net.
    Drive { net: NetId, value: u64 },
    /// Wake an agent with [`Cause::Timer`].
    Wake { agent: AgentId },
}

/// An entry in the event queue, ordered by time then insertion sequence.
#[derive(Debug, Clone)]
struct QueuedEvent {
    time: SimTime,
    seq: u64,
    action: Action,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time.cmp(&other.time).then(self.seq.cmp(&other.seq))
    }
}

/// An edge subscription.
struct Watch {
    net: NetId,
    edge: Edge,
    agent: AgentId,
}

/// The discrete-event kernel: nets, event queue, agents, run control.
pub struct Kernel {
    now: SimTime,
    queue: BinaryHeap<Reverse<QueuedEvent>>,
    seq: u64,
    nets: Vec<NetState>,
    agents: Vec<Option<Box<dyn Agent>>>,
    watches: Vec<Watch>,
    time_limit: Option<u64>,
    max_deltas: u32,
    recorder: Option<Box<dyn WaveformRecorder>>,
}

impl Kernel {
    /// Creates an empty kernel at time zero.
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            queue: BinaryHeap::new(),
            seq: 0,
            nets: Vec::new(),
            agents: Vec::new(),
            watches: Vec::new(),
            time_limit: None,
            max_deltas: 1000,
            recorder: None,
        }
    }

    /// Sets the run-level time limit in femtoseconds.
    pub fn set_time_limit(&mut self, limit_fs: u64) {
        self.time_limit = Some(limit_fs);
    }

    /// Sets the maximum number of delta steps per instant.
    pub fn set_max_deltas(&mut self, max: u32) {
        self.max_deltas = max;
    }

    /// The current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Allocates a net initialized to zero.
    pub fn net(&mut self, name: &str, width: u32) -> NetId {
        self.net_with(name, width, 0)
    }

    /// Allocates a net with an initial value. The initial value produces
    /// no edge.
    pub fn net_with(&mut self, name: &str, width: u32, init: u64) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        self.nets.push(NetState::new(name.to_string(), width, init));
        id
    }

    /// Reads a net's current value without advancing time.
    pub fn peek(&self, net: NetId) -> u64 {
        self.nets[net.as_raw() as usize].value
    }

    /// Reads bit 0 of a net without advancing time.
    pub fn peek_bit(&self, net: NetId) -> bool {
        self.nets[net.as_raw() as usize].bit()
    }

    /// Registers an agent and returns its handle.
    pub fn add_agent(&mut self, agent: Box<dyn Agent>) -> AgentId {
        let id = AgentId(self.agents.len() as u32);
        self.agents.push(Some(agent));
        id
    }

    /// Subscribes an agent to an edge on a net.
    pub fn watch(&mut self, agent: AgentId, net: NetId, edge: Edge) {
        self.watches.push(Watch { net, edge, agent });
    }

    /// Schedules a timer wake for an agent at an absolute time.
    pub fn wake_at(&mut self, agent: AgentId, time: SimTime) {
        self.push(time, Action::Wake { agent });
    }

    /// Drives a net from outside the timeline, applied at the next delta.
    pub fn drive(&mut self, net: NetId, value: u64) {
        let time = self.now.next_delta();
        self.push(time, Action::Drive { net, value });
    }

    /// Drives bit 0 of a net from outside the timeline.
    pub fn drive_bit(&mut self, net: NetId, level: bool) {
        self.drive(net, level as u64);
    }

    /// Attaches a waveform recorder, declaring every net allocated so far
    /// and dumping their current values.
    pub fn attach_recorder(
        &mut self,
        mut recorder: Box<dyn WaveformRecorder>,
    ) -> Result<(), SimError> {
        recorder.begin_scope("harness")?;
        for (idx, net) in self.nets.iter().enumerate() {
            recorder.declare_net(NetId::from_raw(idx as u32), &net.name, net.width)?;
        }
        recorder.end_scope()?;
        for (idx, net) in self.nets.iter().enumerate() {
            recorder.change(self.now.fs, NetId::from_raw(idx as u32), net.value, net.width)?;
        }
        self.recorder = Some(recorder);
        Ok(())
    }

    /// Finalizes and detaches the waveform recorder, if any.
    pub fn finalize_waveform(&mut self) -> Result<(), SimError> {
        if let Some(mut rec) = self.recorder.take() {
            rec.finalize()?;
        }
        Ok(())
    }

    /// Advances the timeline by `dur_fs` femtoseconds, processing every
    /// event that falls inside the window.
    pub fn run_for(&mut self, dur_fs: u64) -> Result<(), SimError> {
        let target_fs = self.now.fs.saturating_add(dur_fs);
        while let Some(next) = self.next_event_time() {
            if next.fs > target_fs {
                break;
            }
            self.check_limits(next)?;
            self.process_instant()?;
        }
        if let Some(limit) = self.time_limit {
            if target_fs > limit {
                return Err(SimError::TimeLimitExceeded { limit_fs: limit });
            }
        }
        if self.now.fs < target_fs {
            self.now = SimTime::from_fs(target_fs);
        }
        Ok(())
    }

    /// Runs the timeline until `done` returns true.
    ///
    /// The condition is evaluated between instants, never inside agent
    /// code. Fails with [`SimError::Stalled`] if the queue drains first, or
    /// [`SimError::TimeLimitExceeded`] once the run limit is passed.
    pub fn run_until(&mut self, mut done: impl FnMut() -> bool) -> Result<(), SimError> {
        while !done() {
            let Some(next) = self.next_event_time() else {
                return Err(SimError::Stalled { at: self.now });
            };
            self.check_limits(next)?;
            self.process_instant()?;
        }
        Ok(())
    }

    /// Runs the timeline until a completion flag fires.
    pub fn run_until_flag(&mut self, flag: &EventFlag) -> Result<(), SimError> {
        let flag = flag.clone();
        self.run_until(move || flag.is_set())
    }

    fn next_event_time(&self) -> Option<SimTime> {
        self.queue.peek().map(|Reverse(ev)| ev.time)
    }

    fn check_limits(&self, next: SimTime) -> Result<(), SimError> {
        if let Some(limit) = self.time_limit {
            if next.fs > limit {
                return Err(SimError::TimeLimitExceeded { limit_fs: limit });
            }
        }
        if next.delta >= self.max_deltas {
            return Err(SimError::DeltaLimit {
                fs: next.fs,
                max_deltas: self.max_deltas,
            });
        }
        Ok(())
    }

    /// Pops and executes every event at the earliest queued instant.
    fn process_instant(&mut self) -> Result<(), SimError> {
        let Some(Reverse(first)) = self.queue.peek() else {
            return Ok(());
        };
        let t = first.time;
        self.now = t;

        let mut timer_wakes: Vec<AgentId> = Vec::new();
        let mut changed: Vec<(NetId, bool, bool)> = Vec::new();
        while let Some(Reverse(ev)) = self.queue.peek() {
            if ev.time != t {
                break;
            }
            let Reverse(ev) = self.queue.pop().unwrap();
            match ev.action {
                Action::Drive { net, value } => {
                    let idx = net.as_raw() as usize;
                    let before = self.nets[idx].bit();
                    if self.nets[idx].apply(value) {
                        let after = self.nets[idx].bit();
                        changed.push((net, before, after));
                        let (value, width) = (self.nets[idx].value, self.nets[idx].width);
                        if let Some(rec) = &mut self.recorder {
                            rec.change(t.fs, net, value, width)?;
                        }
                    }
                }
                Action::Wake { agent } => timer_wakes.push(agent),
            }
        }

        let mut wakes: Vec<(AgentId, Cause)> = timer_wakes
            .into_iter()
            .map(|agent| (agent, Cause::Timer))
            .collect();
        for watch in &self.watches {
            for &(net, prev, curr) in &changed {
                if watch.net == net && edge_between(prev, curr, watch.edge) {
                    let edge = if curr { Edge::Rising } else { Edge::Falling };
                    wakes.push((watch.agent, Cause::Edge { net, edge }));
                }
            }
        }

        for (agent, cause) in wakes {
            self.dispatch(agent, cause)?;
        }
        Ok(())
    }

    /// Runs one agent wake, then folds its scheduled work into the queue.
    fn dispatch(&mut self, id: AgentId, cause: Cause) -> Result<(), SimError> {
        let idx = id.as_raw() as usize;
        let Some(mut agent) = self.agents[idx].take() else {
            return Ok(());
        };
        let mut ctx = SimCtx {
            now: self.now,
            nets: &self.nets,
            agent: id,
            scheduled: Vec::new(),
        };
        let result = agent.wake(cause, &mut ctx);
        let scheduled = ctx.scheduled;
        self.agents[idx] = Some(agent);
        result?;
        for (time, action) in scheduled {
            self.push(time, action);
        }
        Ok(())
    }

    fn push(&mut self, time: SimTime, action: Action) {
        debug_assert!(time >= self.now, "event scheduled in the past");
        self.seq += 1;
        self.queue.push(Reverse(QueuedEvent {
            time,
            seq: self.seq,
            action,
        }));
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}
