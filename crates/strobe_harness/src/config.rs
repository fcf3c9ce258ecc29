//! Harness configuration: frequencies, clock modes, link parameters.
//!
//! A [`HarnessConfig`] is loaded from TOML (or built from defaults) and
//! validated once; everything else — clock periods, the SPI rate divisor,
//! the [`LinkParams`] handed to the loopback peer — derives from it.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use strobe_sim::time::{FS_PER_NS, FS_PER_US};

/// Femtoseconds per second, for period derivation.
const FS_PER_S: u64 = 1_000_000_000_000_000;

/// A frequency stored in integer Hertz.
///
/// Parses from strings like `"100MHz"`, `"10MHz"`, `"48000Hz"`, or a bare
/// number interpreted as Hz. In TOML the value may be written either as a
/// string or as an integer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frequency(u64);

impl Frequency {
    /// Creates a frequency from a value in Hertz.
    pub fn new(hz: u64) -> Self {
        Self(hz)
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> u64 {
        self.0
    }

    /// Returns the period of one cycle in femtoseconds (truncated).
    pub fn period_fs(&self) -> u64 {
        FS_PER_S / self.0
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz >= 1_000_000_000 && hz % 1_000_000_000 == 0 {
            write!(f, "{}GHz", hz / 1_000_000_000)
        } else if hz >= 1_000_000 && hz % 1_000_000 == 0 {
            write!(f, "{}MHz", hz / 1_000_000)
        } else if hz >= 1_000 && hz % 1_000 == 0 {
            write!(f, "{}KHz", hz / 1_000)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error type for frequency strings that fail to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFrequencyError {
    /// The input that failed to parse.
    pub input: String,
}

impl fmt::Display for ParseFrequencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid frequency: '{}'", self.input)
    }
}

impl std::error::Error for ParseFrequencyError {}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };
        let lower = s.to_ascii_lowercase();
        let (digits, scale) = if let Some(n) = lower.strip_suffix("ghz") {
            (n, 1_000_000_000.0)
        } else if let Some(n) = lower.strip_suffix("mhz") {
            (n, 1_000_000.0)
        } else if let Some(n) = lower.strip_suffix("khz") {
            (n, 1_000.0)
        } else if let Some(n) = lower.strip_suffix("hz") {
            (n, 1.0)
        } else {
            (lower.as_str(), 1.0)
        };
        let value: f64 = digits.trim().parse().map_err(|_| err())?;
        if !value.is_finite() || value <= 0.0 {
            return Err(err());
        }
        Ok(Frequency((value * scale).round() as u64))
    }
}

impl Serialize for Frequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FreqVisitor;

        impl Visitor<'_> for FreqVisitor {
            type Value = Frequency;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a frequency string like \"100MHz\" or an integer in Hz")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(de::Error::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                if v == 0 {
                    return Err(de::Error::custom("frequency must be nonzero"));
                }
                Ok(Frequency(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .ok()
                    .filter(|hz| *hz > 0)
                    .map(Frequency)
                    .ok_or_else(|| de::Error::custom("frequency must be positive"))
            }
        }

        deserializer.deserialize_any(FreqVisitor)
    }
}

/// One of the four SPI clock polarity/phase pairings.
///
/// The first digit is the polarity bit (idle level of the SPI clock line),
/// the second the phase bit (phase 0 samples on the leading edge, phase 1
/// on the trailing edge). Fixed for the duration of one scenario run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ClockMode {
    /// Idle-low clock, sample on the leading edge.
    Mode00,
    /// Idle-low clock, sample on the trailing edge.
    Mode01,
    /// Idle-high clock, sample on the leading edge.
    Mode10,
    /// Idle-high clock, sample on the trailing edge.
    Mode11,
}

impl ClockMode {
    /// All four modes, in numbering order.
    pub const ALL: [ClockMode; 4] = [
        ClockMode::Mode00,
        ClockMode::Mode01,
        ClockMode::Mode10,
        ClockMode::Mode11,
    ];

    /// The clock polarity bit: idle level of the SPI clock line.
    pub fn cpol(self) -> bool {
        matches!(self, ClockMode::Mode10 | ClockMode::Mode11)
    }

    /// The clock phase bit: false samples on the leading edge, true on the
    /// trailing edge.
    pub fn cpha(self) -> bool {
        matches!(self, ClockMode::Mode01 | ClockMode::Mode11)
    }

    /// Builds a mode from its polarity and phase bits.
    pub fn from_bits(cpol: bool, cpha: bool) -> Self {
        match (cpol, cpha) {
            (false, false) => ClockMode::Mode00,
            (false, true) => ClockMode::Mode01,
            (true, false) => ClockMode::Mode10,
            (true, true) => ClockMode::Mode11,
        }
    }
}

impl fmt::Display for ClockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.cpol() as u8, self.cpha() as u8)
    }
}

/// Errors raised while loading or validating a harness configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// The bus width is outside the supported range.
    #[error("bus width of {0} bytes is outside 1..=8")]
    InvalidBusWidth(usize),

    /// The SPI rate cannot be derived from the system clock by an even
    /// integer divisor.
    #[error("cannot derive a {rate} bit clock from a {clock} system clock")]
    RateNotDerivable {
        /// The configured system clock.
        clock: Frequency,
        /// The configured SPI bit rate.
        rate: Frequency,
    },
}

/// Parameters of one harness run, loadable from TOML.
///
/// Every field has a default, so an empty document is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Bytes per stream word (and per SPI word), 1..=8.
    pub bus_width: usize,
    /// System clock frequency on the stream side.
    pub clock: Frequency,
    /// Target SPI bit rate.
    pub rate: Frequency,
    /// How long reset is held asserted, in nanoseconds.
    pub reset_hold_ns: u64,
    /// Settle delay after reset release before the first transfer, in
    /// nanoseconds.
    pub settle_ns: u64,
    /// Run-level time limit in microseconds; the only escape from a
    /// protocol hang.
    pub time_limit_us: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            bus_width: 1,
            clock: Frequency::new(100_000_000),
            rate: Frequency::new(10_000_000),
            reset_hold_ns: 1000,
            settle_ns: 1000,
            time_limit_us: 50_000,
        }
    }
}

impl HarnessConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Checks the configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=8).contains(&self.bus_width) {
            return Err(ConfigError::InvalidBusWidth(self.bus_width));
        }
        if self.rate_divisor() == 0 || self.clock.hz() % (2 * self.rate.hz()) != 0 {
            return Err(ConfigError::RateNotDerivable {
                clock: self.clock,
                rate: self.rate,
            });
        }
        Ok(())
    }

    /// System clock cycles per SPI half-bit period.
    pub fn rate_divisor(&self) -> u64 {
        self.clock.hz() / (2 * self.rate.hz())
    }

    /// The SPI word width in bits.
    pub fn word_width(&self) -> u32 {
        (self.bus_width * 8) as u32
    }

    /// The system clock period in femtoseconds.
    pub fn clock_period_fs(&self) -> u64 {
        self.clock.period_fs()
    }

    /// The reset hold duration in femtoseconds.
    pub fn reset_hold_fs(&self) -> u64 {
        self.reset_hold_ns * FS_PER_NS
    }

    /// The post-reset settle delay in femtoseconds.
    pub fn settle_fs(&self) -> u64 {
        self.settle_ns * FS_PER_NS
    }

    /// The run-level time limit in femtoseconds.
    pub fn time_limit_fs(&self) -> u64 {
        self.time_limit_us * FS_PER_US
    }
}

/// Fixed parameters of the SPI link for one run, derived from the
/// configuration: these are contractual for the loopback peer and never
/// change mid-scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParams {
    /// SPI word width in bits.
    pub word_width: u32,
    /// Target SPI bit rate.
    pub rate: Frequency,
    /// Chip select asserts low.
    pub cs_active_low: bool,
    /// Most-significant bit shifts first.
    pub msb_first: bool,
    /// Gap between back-to-back words, in femtoseconds.
    pub frame_spacing_fs: u64,
}

impl LinkParams {
    /// Derives the link parameters for a configuration.
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            word_width: config.word_width(),
            rate: config.rate,
            cs_active_low: true,
            msb_first: true,
            frame_spacing_fs: 0,
        }
    }
}
