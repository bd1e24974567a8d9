//! SID sound chip emulation
//!
//! Bottom-up: [`registers`] decodes the 32-byte register image,
//! [`wave_tables`] and [`noise`] are the waveform sources, [`envelope`] and
//! [`voice`] make up one channel, [`filter`] mixes the channels and [`chip`]
//! ties everything into [`Sid`]. [`snapshot`] captures engine state for
//! save states.

pub mod chip;
pub mod envelope;
pub mod filter;
pub mod noise;
pub mod registers;
pub mod snapshot;
pub mod voice;
pub mod wave_tables;

pub use chip::Sid;
pub use envelope::{AdsrSettings, Envelope, EnvelopePhase};
pub use filter::{Filter, FilterState};
pub use noise::NoiseGenerator;
pub use registers::{ControlFlags, FilterMode, Register, RegisterBank};
pub use snapshot::SidSnapshot;
pub use voice::Voice;
pub use wave_tables::{WaveTables, Waveform};
