//! Stream producer and consumer for the device's ingress and egress.
//!
//! Both sides honor the valid/ready handshake: a beat transfers on a clock
//! edge where both signals are asserted, and both parties observe the same
//! edge. The producer's [`send`](StreamSource::send) and the consumer's
//! [`recv`](StreamSink::recv) block by running the timeline, so a device
//! that never asserts readiness hangs until the run-level time limit.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use strobe_sim::{Agent, Cause, Edge, Kernel, NetId, SimCtx, SimError};

use crate::frame::{word_to_bytes, Frame};
use crate::pins::BridgePins;

struct SourceState {
    queue: VecDeque<Frame>,
}

/// Handle for the ingress producer.
///
/// Frames are submitted strictly one at a time: `send` returns only after
/// the device has accepted the frame and its completion flag has fired.
pub struct StreamSource {
    state: Rc<RefCell<SourceState>>,
}

/// The clocked half of the producer, driving data/valid at the edge.
struct SourceAgent {
    s_tdata: NetId,
    s_tvalid: NetId,
    s_tready: NetId,
    state: Rc<RefCell<SourceState>>,
}

impl StreamSource {
    /// Registers the producer on the ingress pins.
    pub fn install(kernel: &mut Kernel, pins: &BridgePins) -> StreamSource {
        let state = Rc::new(RefCell::new(SourceState {
            queue: VecDeque::new(),
        }));
        let agent = kernel.add_agent(Box::new(SourceAgent {
            s_tdata: pins.s_tdata,
            s_tvalid: pins.s_tvalid,
            s_tready: pins.s_tready,
            state: Rc::clone(&state),
        }));
        kernel.watch(agent, pins.aclk, Edge::Rising);
        StreamSource { state }
    }

    /// Submits one frame and runs the timeline until the device accepts
    /// it. The frame's completion flag fires exactly once, on the
    /// accepting clock edge.
    pub fn send(&self, kernel: &mut Kernel, frame: Frame) -> Result<(), SimError> {
        let accepted = frame.accepted.clone();
        self.state.borrow_mut().queue.push_back(frame);
        kernel.run_until_flag(&accepted)
    }

    /// Frames submitted but not yet accepted.
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }
}

impl Agent for SourceAgent {
    fn name(&self) -> &str {
        "stream_source"
    }

    fn wake(&mut self, _cause: Cause, ctx: &mut SimCtx<'_>) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        let presenting = ctx.read_bit(self.s_tvalid);
        if presenting && ctx.read_bit(self.s_tready) {
            // beat accepted on this edge
            if let Some(frame) = state.queue.pop_front() {
                frame.accepted.fire();
            }
            match state.queue.front() {
                Some(next) => ctx.drive(self.s_tdata, next.word()),
                None => ctx.drive_bit(self.s_tvalid, false),
            }
        } else if !presenting {
            if let Some(front) = state.queue.front() {
                ctx.drive(self.s_tdata, front.word());
                ctx.drive_bit(self.s_tvalid, true);
            }
        }
        Ok(())
    }
}

struct SinkState {
    received: VecDeque<Vec<u8>>,
}

/// Handle for the egress consumer.
///
/// The consumer asserts ready from installation on and captures every beat
/// exactly once, in arrival order; nothing is dropped or reordered.
pub struct StreamSink {
    state: Rc<RefCell<SinkState>>,
}

/// The clocked half of the consumer, capturing beats at the edge.
struct SinkAgent {
    m_tdata: NetId,
    m_tvalid: NetId,
    m_tready: NetId,
    bus_width: usize,
    state: Rc<RefCell<SinkState>>,
}

impl StreamSink {
    /// Registers the consumer on the egress pins and asserts ready.
    pub fn install(kernel: &mut Kernel, pins: &BridgePins, bus_width: usize) -> StreamSink {
        let state = Rc::new(RefCell::new(SinkState {
            received: VecDeque::new(),
        }));
        let agent = kernel.add_agent(Box::new(SinkAgent {
            m_tdata: pins.m_tdata,
            m_tvalid: pins.m_tvalid,
            m_tready: pins.m_tready,
            bus_width,
            state: Rc::clone(&state),
        }));
        kernel.watch(agent, pins.aclk, Edge::Rising);
        kernel.drive_bit(pins.m_tready, true);
        StreamSink { state }
    }

    /// Runs the timeline until a frame is available, then returns its
    /// bytes in arrival order.
    pub fn recv(&self, kernel: &mut Kernel) -> Result<Vec<u8>, SimError> {
        let state = Rc::clone(&self.state);
        kernel.run_until(move || !state.borrow().received.is_empty())?;
        match self.state.borrow_mut().received.pop_front() {
            Some(data) => Ok(data),
            None => Err(SimError::Stalled { at: kernel.now() }),
        }
    }

    /// Frames captured but not yet consumed.
    pub fn collected(&self) -> usize {
        self.state.borrow().received.len()
    }
}

impl Agent for SinkAgent {
    fn name(&self) -> &str {
        "stream_sink"
    }

    fn wake(&mut self, _cause: Cause, ctx: &mut SimCtx<'_>) -> Result<(), SimError> {
        if ctx.read_bit(self.m_tvalid) && ctx.read_bit(self.m_tready) {
            let word = ctx.read(self.m_tdata);
            self.state
                .borrow_mut()
                .received
                .push_back(word_to_bytes(word, self.bus_width));
        }
        Ok(())
    }
}
