//! Bit-accurate SPI loopback responder.
//!
//! [`SpiLoopback`] sits on the peripheral side of the link and echoes each
//! word back one transaction late: while a word is shifting in, the line
//! going the other way carries the *previously completed* word. That
//! one-word latency is the contract of a loopback peer, not an artifact —
//! the first word it ever emits predates any real data and is discarded by
//! the oracle.

use strobe_sim::{Agent, AgentId, Cause, Edge, Kernel, NetId, SimCtx, SimError};

use crate::config::{ClockMode, LinkParams};

/// Transaction state of the responder.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PeerState {
    /// Chip select deasserted.
    Idle,
    /// Selected, no active clock edge seen yet for this word.
    Framing,
    /// Bits moving in both directions.
    Shifting,
    /// A full word has been latched; more edges start the next word.
    Complete,
}

/// The loopback peer: samples the controller-out line on the mode's sample
/// edge and drives the controller-in line with the previous word,
/// most-significant bit first.
///
/// The word register survives chip-select framing, so the echo crosses
/// transactions; it starts at zero. Back-to-back words under one select
/// are supported.
pub struct SpiLoopback {
    sclk: NetId,
    copi: NetId,
    cipo: NetId,
    csn: NetId,
    word_width: u32,
    cs_active_low: bool,
    cpol: bool,
    cpha: bool,
    state: PeerState,
    /// Bits sampled so far for the word in flight.
    rx: u64,
    /// Shift register for the word being driven out.
    tx: u64,
    /// The previously completed word, echoed on the next transaction.
    word: u64,
    sampled: u32,
    driven: u32,
}

impl SpiLoopback {
    /// Registers a loopback peer on the given link nets.
    pub fn install(
        kernel: &mut Kernel,
        sclk: NetId,
        copi: NetId,
        cipo: NetId,
        csn: NetId,
        link: &LinkParams,
        mode: ClockMode,
    ) -> AgentId {
        let agent = kernel.add_agent(Box::new(SpiLoopback {
            sclk,
            copi,
            cipo,
            csn,
            word_width: link.word_width,
            cs_active_low: link.cs_active_low,
            cpol: mode.cpol(),
            cpha: mode.cpha(),
            state: PeerState::Idle,
            rx: 0,
            tx: 0,
            word: 0,
            sampled: 0,
            driven: 0,
        }));
        kernel.watch(agent, csn, Edge::Any);
        kernel.watch(agent, sclk, Edge::Any);
        agent
    }

    /// Latches one incoming bit; at the word boundary the completed word
    /// becomes the next echo.
    fn shift_in(&mut self, ctx: &SimCtx<'_>) {
        let bit = ctx.read_bit(self.copi) as u64;
        self.rx = (self.rx << 1) | bit;
        self.sampled += 1;
        if self.sampled == self.word_width {
            self.word = self.rx & word_mask(self.word_width);
            self.rx = 0;
            self.sampled = 0;
            self.state = PeerState::Complete;
        } else {
            self.state = PeerState::Shifting;
        }
    }

    /// Drives the next outgoing bit, reloading the shift register from the
    /// last completed word at each word boundary.
    fn shift_out(&mut self, ctx: &mut SimCtx<'_>) {
        if self.driven == self.word_width {
            self.tx = self.word;
            self.driven = 0;
        }
        let bit = (self.tx >> (self.word_width - 1 - self.driven)) & 1 != 0;
        ctx.drive_bit(self.cipo, bit);
        self.driven += 1;
    }
}

impl Agent for SpiLoopback {
    fn name(&self) -> &str {
        "spi_loopback"
    }

    fn wake(&mut self, cause: Cause, ctx: &mut SimCtx<'_>) -> Result<(), SimError> {
        let Cause::Edge { net, .. } = cause else {
            return Ok(());
        };

        if net == self.csn {
            let selected = ctx.read_bit(self.csn) != self.cs_active_low;
            if selected {
                self.state = PeerState::Framing;
                self.rx = 0;
                self.sampled = 0;
                self.tx = self.word;
                self.driven = 0;
                if !self.cpha {
                    // phase 0 presents the first bit at select time
                    self.shift_out(ctx);
                }
            } else {
                self.state = PeerState::Idle;
                ctx.drive_bit(self.cipo, false);
            }
            return Ok(());
        }

        // SPI clock edge; only meaningful while selected.
        if self.state == PeerState::Idle {
            return Ok(());
        }
        let leading = ctx.read_bit(self.sclk) != self.cpol;
        let samples_now = if self.cpha { !leading } else { leading };
        if samples_now {
            self.shift_in(ctx);
        } else {
            self.state = PeerState::Shifting;
            self.shift_out(ctx);
        }
        Ok(())
    }
}

/// All-ones mask for an SPI word width.
fn word_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Frequency;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use strobe_sim::{EventFlag, SimTime, FS_PER_NS};

    /// Script position of the test controller.
    enum Step {
        NextWord,
        Select,
        Toggle,
        Gap,
    }

    /// A timer-driven SPI controller that shifts a fixed word list through
    /// the link and collects what comes back.
    struct ScriptedController {
        sclk: NetId,
        copi: NetId,
        cipo: NetId,
        csn: NetId,
        cpol: bool,
        cpha: bool,
        width: u32,
        half_fs: u64,
        hold_select: bool,
        words: VecDeque<u64>,
        collected: Rc<RefCell<Vec<u64>>>,
        done: EventFlag,
        cur: u64,
        rx: u64,
        edges: u32,
        out_idx: u32,
        step: Step,
    }

    impl ScriptedController {
        fn drive_out(&mut self, ctx: &mut SimCtx<'_>) {
            let bit = (self.cur >> (self.width - 1 - self.out_idx)) & 1 != 0;
            ctx.drive_bit(self.copi, bit);
            self.out_idx += 1;
        }

        fn sample_in(&mut self, ctx: &SimCtx<'_>) {
            self.rx = (self.rx << 1) | ctx.read_bit(self.cipo) as u64;
        }
    }

    impl Agent for ScriptedController {
        fn name(&self) -> &str {
            "scripted_controller"
        }

        fn wake(&mut self, _cause: Cause, ctx: &mut SimCtx<'_>) -> Result<(), SimError> {
            match self.step {
                Step::NextWord => {
                    if self.words.is_empty() {
                        self.done.fire();
                        return Ok(());
                    }
                    // park the clock at its idle level before selecting
                    ctx.drive_bit(self.sclk, self.cpol);
                    self.step = Step::Select;
                    ctx.wake_in(self.half_fs);
                }
                Step::Select => {
                    self.cur = self.words.pop_front().unwrap();
                    self.rx = 0;
                    self.edges = 0;
                    self.out_idx = 0;
                    ctx.drive_bit(self.csn, false);
                    if !self.cpha {
                        self.drive_out(ctx);
                    }
                    self.step = Step::Toggle;
                    ctx.wake_in(self.half_fs);
                }
                Step::Toggle => {
                    self.edges += 1;
                    let leading = self.edges % 2 == 1;
                    ctx.drive_bit(self.sclk, leading != self.cpol);
                    if !self.cpha {
                        if leading {
                            self.sample_in(ctx);
                        } else if self.out_idx < self.width {
                            self.drive_out(ctx);
                        }
                    } else if leading {
                        self.drive_out(ctx);
                    } else {
                        self.sample_in(ctx);
                    }
                    if self.edges == 2 * self.width {
                        self.collected.borrow_mut().push(self.rx);
                        if self.hold_select && !self.words.is_empty() {
                            // next word continues under the same select
                            self.cur = self.words.pop_front().unwrap();
                            self.rx = 0;
                            self.edges = 0;
                            self.out_idx = 0;
                            if !self.cpha {
                                self.drive_out(ctx);
                            }
                        } else {
                            self.step = Step::Gap;
                        }
                    }
                    ctx.wake_in(self.half_fs);
                }
                Step::Gap => {
                    ctx.drive_bit(self.csn, true);
                    self.step = Step::NextWord;
                    ctx.wake_in(self.half_fs);
                }
            }
            Ok(())
        }
    }

    fn link(width: u32) -> LinkParams {
        LinkParams {
            word_width: width,
            rate: Frequency::new(10_000_000),
            cs_active_low: true,
            msb_first: true,
            frame_spacing_fs: 0,
        }
    }

    fn run_controller(mode: ClockMode, width: u32, words: &[u64], hold_select: bool) -> Vec<u64> {
        let mut kernel = Kernel::new();
        kernel.set_time_limit(SimTime::from_us(1000).fs);
        let sclk = kernel.net("sclk", 1);
        let copi = kernel.net("copi", 1);
        let cipo = kernel.net("cipo", 1);
        let csn = kernel.net_with("csn", 1, 1);
        SpiLoopback::install(&mut kernel, sclk, copi, cipo, csn, &link(width), mode);

        let collected = Rc::new(RefCell::new(Vec::new()));
        let done = EventFlag::new();
        let id = kernel.add_agent(Box::new(ScriptedController {
            sclk,
            copi,
            cipo,
            csn,
            cpol: mode.cpol(),
            cpha: mode.cpha(),
            width,
            half_fs: 50 * FS_PER_NS,
            hold_select,
            words: words.iter().copied().collect(),
            collected: Rc::clone(&collected),
            done: done.clone(),
            cur: 0,
            rx: 0,
            edges: 0,
            out_idx: 0,
            step: Step::NextWord,
        }));
        kernel.wake_at(id, SimTime::from_ns(100));
        kernel.run_until_flag(&done).unwrap();
        let result = collected.borrow().clone();
        result
    }

    #[test]
    fn echoes_previous_word_in_every_mode() {
        for mode in ClockMode::ALL {
            let echoes = run_controller(mode, 8, &[0xA5, 0x3C, 0x7E], false);
            assert_eq!(echoes, vec![0x00, 0xA5, 0x3C], "mode {mode}");
        }
    }

    #[test]
    fn first_echo_is_the_stale_word() {
        let echoes = run_controller(ClockMode::Mode00, 8, &[0xFF], false);
        assert_eq!(echoes, vec![0x00]);
    }

    #[test]
    fn echo_register_survives_select_framing() {
        // Each word is framed by its own select assertion; the echo still
        // carries across.
        let echoes = run_controller(ClockMode::Mode11, 8, &[0x01, 0x02, 0x03, 0x04], false);
        assert_eq!(echoes, vec![0x00, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn back_to_back_words_under_one_select() {
        let echoes = run_controller(ClockMode::Mode00, 8, &[0x11, 0x22, 0x33], true);
        assert_eq!(echoes, vec![0x00, 0x11, 0x22]);
    }

    #[test]
    fn back_to_back_trailing_sample_mode() {
        let echoes = run_controller(ClockMode::Mode01, 8, &[0x11, 0x22, 0x33], true);
        assert_eq!(echoes, vec![0x00, 0x11, 0x22]);
    }

    #[test]
    fn sixteen_bit_words() {
        let echoes = run_controller(ClockMode::Mode00, 16, &[0xBEEF, 0x1234], false);
        assert_eq!(echoes, vec![0x0000, 0xBEEF]);
    }

    #[test]
    fn word_mask_widths() {
        assert_eq!(word_mask(8), 0xFF);
        assert_eq!(word_mask(16), 0xFFFF);
        assert_eq!(word_mask(64), u64::MAX);
    }
}
