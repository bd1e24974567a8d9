//! MOS 6581/8580 SID emulator for the Commodore 64
//!
//! A sample-driven emulation of the SID sound chip: three oscillator/envelope
//! voices with phase-accumulated waveforms, the 24-bit noise shift register,
//! combined-waveform lookup tables and a resonant multi-mode filter. Every
//! output sample is computed from the 32-byte register image with integer and
//! fixed-point arithmetic, reproducing the table-driven approximation used by
//! the long-standing "fast" software SID engines rather than an analog model.
//!
//! # Features
//! - Two chip revisions (6581 and 8580) with their own combined waveforms
//! - Hard sync and ring modulation between neighbouring voices
//! - ADSR envelope with exponential decay/release approximation
//! - Noise LFSR with catch-up shifting and lockup protection
//! - Low/band/high-pass filter with resonance and per-voice routing
//! - Bit-exact snapshots for save states
//!
//! # Crate feature flags
//! - `export-wav` (opt-in): WAV file rendering via `hound` (`export`)
//!
//! # Quick start
//! ```
//! use sid6581::{ChipModel, Sid, SidConfig};
//!
//! let mut chip = Sid::new(SidConfig::pal()).unwrap();
//! chip.initialize(ChipModel::Mos6581);
//!
//! chip.write_register(0x00, 0x25); // Voice 1 frequency lo
//! chip.write_register(0x01, 0x1D); // Voice 1 frequency hi
//! chip.write_register(0x05, 0x09); // Attack 0, decay 9
//! chip.write_register(0x06, 0xF0); // Sustain 15, release 0
//! chip.write_register(0x18, 0x0F); // Master volume
//! chip.write_register(0x04, 0x21); // Sawtooth + gate
//!
//! let sample = chip.compute_sample().unwrap();
//! # let _ = sample;
//! ```
//!
//! # Threading
//! A [`Sid`] is not internally synchronised. Register writes and sample
//! computation on the same instance must be serialised by the caller; a
//! write becomes audible starting with the first sample computed after it.

#![warn(missing_docs)]

pub mod backend;
pub mod config;
#[cfg(feature = "export-wav")]
pub mod export;
pub mod sid;

/// Error types for SID emulator operations
#[derive(thiserror::Error, Debug)]
pub enum SidError {
    /// A sample was requested before a chip model was selected
    #[error("SID not initialized: select a chip model before computing samples")]
    NotInitialized,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Snapshot encoding or decoding failed
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Error writing audio file
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for SidError {
    /// Converts a String into `SidError::Other`.
    ///
    /// Prefer the specific variants (`ConfigError`, `AudioFileError`) where the
    /// failure class is known; this conversion exists for ad-hoc messages.
    fn from(msg: String) -> Self {
        SidError::Other(msg)
    }
}

impl From<&str> for SidError {
    /// Converts a string slice into `SidError::Other`.
    fn from(msg: &str) -> Self {
        SidError::Other(msg.to_string())
    }
}

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, SidError>;

// Public API exports
pub use backend::SidBackend;
pub use config::{ChipModel, SidConfig};
pub use sid::{EnvelopePhase, Sid, SidSnapshot, WaveTables};
