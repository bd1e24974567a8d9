//! ADSR envelope generator
//!
//! The counter is 31 bits wide (kept in a `u32`, full scale `0x7FFF_FFFF`)
//! and moves by a signed per-sample step towards a target. Attack is linear.
//! Decay and release approximate the chip's exponential curve piecewise: the
//! step is halved each time the counter falls below one of a fixed set of
//! breakpoints. Reaching a target fires the phase trigger, which moves the
//! state machine on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Full-scale envelope counter
pub const ENVELOPE_FULL: u32 = 0x7FFF_FFFF;

/// Relative duration of each rate code (attack time in units of ~2 ms)
const RATE_DIVISORS: [u32; 16] = [
    1, 4, 16, 26, 38, 58, 68, 80, 100, 250, 500, 800, 1000, 3000, 5000, 8000,
];

/// Counter step of rate code 0 per unit of oscillator speed
const RATE_SCALE: u64 = 500 * 8;

/// Counter value of each of the 16 sustain levels
const SUSTAIN_STEP: u32 = 0x0888_8888;

/// Breakpoints of the piecewise exponential decay/release
const EXP_BREAKPOINTS: [u32; 6] = [
    0x3000_0000,
    0x1C00_0000,
    0x0E00_0000,
    0x0800_0000,
    0x0400_0000,
    0,
];

/// ADSR state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnvelopePhase {
    /// Rising linearly to full scale
    Attack,
    /// Falling towards the sustain level
    Decay,
    /// Holding at the sustain level
    Sustain,
    /// Falling towards zero after gate off
    Release,
    /// Silent, waiting for a gate
    #[default]
    Idle,
}

impl fmt::Display for EnvelopePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopePhase::Attack => write!(f, "attack"),
            EnvelopePhase::Decay => write!(f, "decay"),
            EnvelopePhase::Sustain => write!(f, "sustain"),
            EnvelopePhase::Release => write!(f, "release"),
            EnvelopePhase::Idle => write!(f, "idle"),
        }
    }
}

/// Per-sample counter steps for the 16 rate codes
///
/// Depends only on the clock to sample rate ratio, so one table serves all
/// three voices of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeRates {
    steps: [u32; 16],
}

impl EnvelopeRates {
    /// Build the table for an oscillator speed (see [`crate::SidConfig::speed`])
    pub fn new(speed: u32) -> Self {
        Self {
            steps: RATE_DIVISORS.map(|d| (RATE_SCALE * u64::from(speed) / u64::from(d)) as u32),
        }
    }

    /// Counter step for a 4-bit rate code
    #[inline]
    pub fn step(&self, rate: u8) -> u32 {
        self.steps[usize::from(rate & 0x0F)]
    }
}

/// Attack/decay/sustain/release nibbles of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdsrSettings {
    /// Attack rate code
    pub attack: u8,
    /// Decay rate code
    pub decay: u8,
    /// Sustain level (0-15)
    pub sustain: u8,
    /// Release rate code
    pub release: u8,
}

impl AdsrSettings {
    /// Decode the attack/decay and sustain/release registers
    pub fn from_registers(attack_decay: u8, sustain_release: u8) -> Self {
        Self {
            attack: attack_decay >> 4,
            decay: attack_decay & 0x0F,
            sustain: sustain_release >> 4,
            release: sustain_release & 0x0F,
        }
    }

    #[inline]
    fn sustain_level(&self) -> u32 {
        SUSTAIN_STEP * u32::from(self.sustain & 0x0F)
    }
}

/// Envelope state of one voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    counter: u32,
    step: i32,
    target: u32,
    phase: EnvelopePhase,
    settings: AdsrSettings,
}

impl Envelope {
    /// Silent envelope in the idle phase
    pub fn new() -> Self {
        Self {
            counter: 0,
            step: 0,
            target: 0,
            phase: EnvelopePhase::Idle,
            settings: AdsrSettings::default(),
        }
    }

    /// Return to the power-on state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Current phase
    #[inline]
    pub fn phase(&self) -> EnvelopePhase {
        self.phase
    }

    /// Raw 31-bit counter
    #[inline]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Settings captured at the last gate update
    pub fn settings(&self) -> AdsrSettings {
        self.settings
    }

    /// 15-bit amplitude the oscillator output is scaled by
    #[inline]
    pub fn amplitude(&self) -> u32 {
        self.counter >> 16
    }

    /// 8-bit level as read back through the ENV3 register
    #[inline]
    pub fn level(&self) -> u8 {
        (self.counter >> 23) as u8
    }

    /// Apply new register settings and the current gate
    ///
    /// `retrigger` is set when the gate was switched off and on again since
    /// the last update, which restarts the attack even though the gate looks
    /// unchanged. Otherwise the current phase is kept and its step and target
    /// are re-derived from the new settings.
    pub fn update_gate(
        &mut self,
        gate: bool,
        retrigger: bool,
        settings: AdsrSettings,
        rates: &EnvelopeRates,
    ) {
        self.settings = settings;
        let next = match self.phase {
            EnvelopePhase::Attack | EnvelopePhase::Decay | EnvelopePhase::Sustain => {
                if !gate {
                    EnvelopePhase::Release
                } else if retrigger {
                    EnvelopePhase::Attack
                } else {
                    self.phase
                }
            }
            EnvelopePhase::Release | EnvelopePhase::Idle => {
                if gate {
                    EnvelopePhase::Attack
                } else {
                    self.phase
                }
            }
        };
        self.enter(next, rates);
    }

    /// Advance the counter by one sample
    #[inline]
    pub fn clock(&mut self, rates: &EnvelopeRates) {
        if self.step == 0 {
            return;
        }
        self.counter = self.counter.wrapping_add_signed(self.step);
        if (self.counter as i32) < (self.target as i32) {
            self.trigger(rates);
        }
    }

    fn trigger(&mut self, rates: &EnvelopeRates) {
        match self.phase {
            EnvelopePhase::Attack => {
                self.counter = ENVELOPE_FULL;
                self.enter(EnvelopePhase::Decay, rates);
            }
            EnvelopePhase::Decay | EnvelopePhase::Release => {
                if self.counter > ENVELOPE_FULL {
                    self.counter = 0;
                }
                self.enter(self.phase, rates);
            }
            EnvelopePhase::Sustain | EnvelopePhase::Idle => {}
        }
    }

    /// Exponential segment the counter sits in: (step shift, breakpoint)
    fn segment(&self) -> (u32, u32) {
        EXP_BREAKPOINTS
            .iter()
            .position(|&b| self.counter >= b)
            .map_or((5, 0), |i| (i as u32, EXP_BREAKPOINTS[i]))
    }

    /// Enter a phase and derive its step and target from the counter
    fn enter(&mut self, phase: EnvelopePhase, rates: &EnvelopeRates) {
        let sustain = self.settings.sustain_level();
        match phase {
            EnvelopePhase::Attack => {
                self.phase = phase;
                self.step = rates.step(self.settings.attack) as i32;
                self.target = 0;
            }
            EnvelopePhase::Decay => {
                if self.counter <= sustain {
                    self.enter(EnvelopePhase::Sustain, rates);
                    return;
                }
                let (shift, breakpoint) = self.segment();
                self.phase = phase;
                self.step = -(rates.step(self.settings.decay) as i32) >> shift;
                self.target = breakpoint.max(sustain);
            }
            EnvelopePhase::Sustain => {
                if self.counter > sustain {
                    self.enter(EnvelopePhase::Decay, rates);
                    return;
                }
                self.phase = phase;
                self.step = 0;
                self.target = 0;
            }
            EnvelopePhase::Release => {
                if self.counter == 0 {
                    self.enter(EnvelopePhase::Idle, rates);
                    return;
                }
                let (shift, breakpoint) = self.segment();
                self.phase = phase;
                self.step = -(rates.step(self.settings.release) as i32) >> shift;
                self.target = breakpoint;
            }
            EnvelopePhase::Idle => {
                self.phase = phase;
                self.step = 0;
                self.target = 0;
            }
        }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}
