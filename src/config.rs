//! Chip model and clock configuration
//!
//! The host picks a chip revision, the system clock the chip is driven by and
//! the output sample rate. Everything the engine precomputes per instance
//! (oscillator step scale, envelope rates, filter coefficients) derives from
//! this configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Result, SidError};

/// PAL C64 system clock in Hz
pub const PAL_CLOCK_FREQUENCY: u32 = 985_248;

/// NTSC C64 system clock in Hz
pub const NTSC_CLOCK_FREQUENCY: u32 = 1_022_727;

/// Default audio sample rate (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// SID hardware revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChipModel {
    /// Original NMOS revision (C64 "breadbin")
    #[default]
    Mos6581,
    /// HMOS-II revision (C64C, C128)
    Mos8580,
}

impl ChipModel {
    /// Index used for per-model constant tables
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            ChipModel::Mos6581 => 0,
            ChipModel::Mos8580 => 1,
        }
    }
}

impl fmt::Display for ChipModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChipModel::Mos6581 => write!(f, "MOS 6581"),
            ChipModel::Mos8580 => write!(f, "MOS 8580"),
        }
    }
}

/// Engine configuration
///
/// # Example
///
/// ```
/// use sid6581::{ChipModel, SidConfig};
///
/// let config = SidConfig::ntsc()
///     .with_model(ChipModel::Mos8580)
///     .with_sample_rate(48_000)
///     .with_filter(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidConfig {
    /// Chip revision selected when the engine is built with [`crate::Sid::with_model`]
    pub model: ChipModel,
    /// System clock driving the chip, in Hz
    pub clock_frequency: u32,
    /// Output sample rate, in Hz
    pub sample_rate: u32,
    /// Run routed voices through the filter (otherwise voices are summed directly)
    pub filter_enabled: bool,
}

impl SidConfig {
    /// PAL machine at 44.1 kHz with a 6581 and the filter enabled
    pub fn pal() -> Self {
        Self {
            model: ChipModel::Mos6581,
            clock_frequency: PAL_CLOCK_FREQUENCY,
            sample_rate: DEFAULT_SAMPLE_RATE,
            filter_enabled: true,
        }
    }

    /// NTSC machine at 44.1 kHz with a 6581 and the filter enabled
    pub fn ntsc() -> Self {
        Self {
            clock_frequency: NTSC_CLOCK_FREQUENCY,
            ..Self::pal()
        }
    }

    /// Select the chip revision
    pub fn with_model(mut self, model: ChipModel) -> Self {
        self.model = model;
        self
    }

    /// Select the output sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Select the system clock frequency
    pub fn with_clock_frequency(mut self, clock_frequency: u32) -> Self {
        self.clock_frequency = clock_frequency;
        self
    }

    /// Enable or disable filter emulation
    pub fn with_filter(mut self, enabled: bool) -> Self {
        self.filter_enabled = enabled;
        self
    }

    /// Check that the clocks produce a usable oscillator step
    ///
    /// # Errors
    ///
    /// Returns [`SidError::ConfigError`] when either rate is zero, when the
    /// sample rate exceeds the chip clock, or when the per-sample phase step
    /// of the highest frequency would not fit the 32-bit accumulator.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(SidError::ConfigError("sample rate must be non-zero".into()));
        }
        if self.clock_frequency == 0 {
            return Err(SidError::ConfigError("clock frequency must be non-zero".into()));
        }
        if self.sample_rate > self.clock_frequency {
            return Err(SidError::ConfigError(format!(
                "sample rate {} Hz exceeds chip clock {} Hz",
                self.sample_rate, self.clock_frequency
            )));
        }
        let max_step = u64::from(self.speed()) * u64::from(u16::MAX);
        if max_step > u64::from(u32::MAX) {
            return Err(SidError::ConfigError(format!(
                "sample rate {} Hz too low for clock {} Hz",
                self.sample_rate, self.clock_frequency
            )));
        }
        Ok(())
    }

    /// Phase step per unit of the 16-bit frequency register per output sample
    ///
    /// The 24-bit hardware accumulator is kept left-justified in a `u32`, so
    /// the step is `clock * 256 / sample_rate`.
    #[inline]
    pub fn speed(&self) -> u32 {
        ((u64::from(self.clock_frequency) << 8) / u64::from(self.sample_rate.max(1))) as u32
    }
}

impl Default for SidConfig {
    fn default() -> Self {
        Self::pal()
    }
}
