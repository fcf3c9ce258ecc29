//! Waveform capture for post-mortem debugging.
//!
//! The [`WaveformRecorder`] trait abstracts the output format;
//! [`VcdRecorder`] writes IEEE 1364 Value Change Dump text, viewable in
//! GTKWave or Surfer. Attach a recorder to a kernel before a run to keep a
//! full trace of the link when a scenario fails.

use std::io::Write;

use crate::error::SimError;
use crate::net::NetId;

/// Trait for recording net activity during a run.
pub trait WaveformRecorder {
    /// Opens a scope (hierarchy level) in the output.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Declares a net inside the current scope.
    fn declare_net(&mut self, id: NetId, name: &str, width: u32) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value change at the given time in femtoseconds.
    fn change(&mut self, time_fs: u64, id: NetId, value: u64, width: u32) -> Result<(), SimError>;

    /// Flushes and writes any trailer.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD (Value Change Dump) recorder.
///
/// Identifier codes use printable ASCII starting at `!`, extending to
/// multiple characters past 94 nets.
pub struct VcdRecorder<W: Write> {
    writer: W,
    codes: Vec<(NetId, String, u32)>,
    next_code: u32,
    header_written: bool,
    current_time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codes: Vec::new(),
            next_code: 0,
            header_written: false,
            current_time: None,
        }
    }

    fn write_header(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  strobe harness")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1fs")?;
        writeln!(self.writer, "$end")?;
        Ok(())
    }

    fn code_for(index: u32) -> String {
        let mut out = String::new();
        let mut idx = index;
        loop {
            out.push((b'!' + (idx % 94) as u8) as char);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        out
    }

    fn format_value(value: u64, width: u32) -> String {
        if width == 1 {
            if value & 1 != 0 { "1".into() } else { "0".into() }
        } else {
            let mut s = String::with_capacity(width as usize + 1);
            s.push('b');
            for bit in (0..width).rev() {
                s.push(if value >> bit & 1 != 0 { '1' } else { '0' });
            }
            s
        }
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        if !self.header_written {
            self.write_header()?;
            self.header_written = true;
        }
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn declare_net(&mut self, id: NetId, name: &str, width: u32) -> Result<(), SimError> {
        let code = Self::code_for(self.next_code);
        self.next_code += 1;
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        self.codes.push((id, code, width));
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn change(&mut self, time_fs: u64, id: NetId, value: u64, width: u32) -> Result<(), SimError> {
        if self.current_time != Some(time_fs) {
            if self.current_time.is_none() {
                writeln!(self.writer, "$enddefinitions $end")?;
                writeln!(self.writer, "$dumpvars")?;
            }
            writeln!(self.writer, "#{time_fs}")?;
            self.current_time = Some(time_fs);
        }
        let code = self
            .codes
            .iter()
            .find(|(net, _, _)| *net == id)
            .map(|(_, code, _)| code.as_str())
            .unwrap_or("?");
        let val = Self::format_value(value, width);
        if width == 1 {
            writeln!(self.writer, "{val}{code}")?;
        } else {
            writeln!(self.writer, "{val} {code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            if !self.header_written {
                self.write_header()?;
                self.header_written = true;
            }
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
