//! Noise generator
//!
//! The SID produces noise from a 23-stage linear-feedback shift register
//! (kept here in the low 24 bits of a `u32`) clocked sixteen times per
//! oscillator cycle. Bits 22 and 17 are XORed and fed back into bit 0.
//!
//! Shifting is lazy: the register is committed on every accumulator
//! overflow and lags the real hardware by `accumulator >> 28` pending shifts,
//! which are applied on the fly when a sample is taken. The 8-bit output is
//! assembled from eight register taps through three byte lookup tables, one
//! per register byte, instead of a 16M-entry table.

use serde::{Deserialize, Serialize};

/// Power-on / test-bit seed of the shift register
pub const NOISE_SEED: u32 = 0x7F_FFF8;

/// Shifts applied per oscillator cycle (one shift per bit-19 edge of the 24-bit accumulator)
pub const SHIFTS_PER_CYCLE: u32 = 16;

const REGISTER_MASK: u32 = 0xFF_FFFF;

/// Output bits 2..0 from register bits 7, 4, 2
const fn build_low_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (((i >> 5) & 0x04) | ((i >> 3) & 0x02) | ((i >> 2) & 0x01)) as u8;
        i += 1;
    }
    table
}

/// Output bits 4..3 from register bits 13, 11
const fn build_mid_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (((i >> 1) & 0x10) | (i & 0x08)) as u8;
        i += 1;
    }
    table
}

/// Output bits 7..5 from register bits 22, 20, 16
const fn build_high_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (((i << 1) & 0x80) | ((i << 2) & 0x40) | ((i << 5) & 0x20)) as u8;
        i += 1;
    }
    table
}

static NOISE_LOW: [u8; 256] = build_low_table();
static NOISE_MID: [u8; 256] = build_mid_table();
static NOISE_HIGH: [u8; 256] = build_high_table();

/// Apply `n` feedback shifts at once (`n <= 16`)
#[inline]
pub fn shift(value: u32, n: u32) -> u32 {
    debug_assert!(n <= SHIFTS_PER_CYCLE, "at most one cycle of shifts at a time");
    let feedback = ((value >> (23 - n)) ^ (value >> (18 - n))) & ((1 << n) - 1);
    ((value << n) | feedback) & REGISTER_MASK
}

/// 8-bit noise output for a register value
#[inline]
pub fn output(value: u32) -> u8 {
    NOISE_LOW[(value & 0xFF) as usize]
        | NOISE_MID[((value >> 8) & 0xFF) as usize]
        | NOISE_HIGH[((value >> 16) & 0xFF) as usize]
}

/// Per-voice noise shift register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseGenerator {
    register: u32,
}

impl NoiseGenerator {
    /// Create a generator holding the power-on seed
    pub fn new() -> Self {
        Self {
            register: NOISE_SEED,
        }
    }

    /// Reload the power-on seed
    #[inline]
    pub fn reseed(&mut self) {
        self.register = NOISE_SEED;
    }

    /// Commit `n` shifts (0-16) to the register
    ///
    /// A register that collapses to all zeros would never recover, so it is
    /// reloaded with the seed.
    #[inline]
    pub fn clock(&mut self, n: u32) {
        self.register = shift(self.register, n);
        if self.register == 0 {
            log::trace!("noise register locked up, reseeding");
            self.reseed();
        }
    }

    /// Commit one full oscillator cycle of shifts
    #[inline]
    pub fn clock_cycle(&mut self) {
        self.clock(SHIFTS_PER_CYCLE);
    }

    /// 8-bit sample with `pending` (0-15) uncommitted shifts applied
    #[inline]
    pub fn sample(&self, pending: u32) -> u8 {
        match shift(self.register, pending) {
            0 => output(NOISE_SEED),
            value => output(value),
        }
    }

    /// Raw 24-bit register value
    #[inline]
    pub fn register(&self) -> u32 {
        self.register
    }

    /// Overwrite the register (masked to 24 bits, zero reseeds)
    pub fn set_register(&mut self, value: u32) {
        self.register = value & REGISTER_MASK;
        if self.register == 0 {
            self.reseed();
        }
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}
