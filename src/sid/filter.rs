//! Multi-mode resonant filter and output mixer
//!
//! Each voice has its own filter channel: a low and a reference integrator
//! plus the 8-bit value passed in and out of the recurrence. Every voice is
//! first scaled by the output stage amplifier curve; routed voices then run
//! one step of the recurrence for the selected mode. The three results are
//! summed, re-centred and multiplied by the master volume.
//!
//! Cutoff and resonance coefficients come from tables that depend on the
//! output sample rate, so they are built per engine rather than shared.

use serde::{Deserialize, Serialize};

use super::registers::{FilterMode, RegisterBank, NUM_VOICES};
use crate::config::ChipModel;

/// Sample rate the coefficient curves were tuned at
const REFERENCE_RATE: f64 = 44_100.0;

/// Number of cutoff steps (11-bit register)
const CUTOFF_STEPS: usize = 2048;

/// Mode bits of `$18` that select the recurrence
const MODE_MASK: u8 = 0x70;

/// DC offset removed from the sum of three centred voices
const MIX_OFFSET: i32 = 0x600;

/// Serialize `f32` as its raw bits so restored filters continue bit-exactly
mod float_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(value.to_bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        u32::deserialize(deserializer).map(f32::from_bits)
    }
}

/// Coefficient tables for one sample rate and chip revision
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTables {
    low_pass: Box<[f32]>,
    band_pass: Box<[f32]>,
    resonance: [f32; 16],
    amp_mod: [i8; 256],
}

impl FilterTables {
    /// Build the tables
    pub fn new(sample_rate: u32, model: ChipModel) -> Self {
        let rate_scale = REFERENCE_RATE / f64::from(sample_rate.max(1));

        let low_pass = (0..CUTOFF_STEPS)
            .map(|k| {
                let curve = (k as f64 / CUTOFF_STEPS as f64 * 400f64.ln()).exp() / 60.0 + 0.05;
                (curve * rate_scale).clamp(0.01, 1.0) as f32
            })
            .collect();

        let band_step = (0.22 - 0.002) / CUTOFF_STEPS as f64;
        let band_pass = (0..CUTOFF_STEPS)
            .map(|k| ((0.002 + band_step * k as f64) * rate_scale) as f32)
            .collect();

        let mut resonance = [0f32; 16];
        let mut level = 2.0f64;
        for r in resonance.iter_mut() {
            *r = level as f32;
            level -= 1.0 / 15.0;
        }

        let gain = match model {
            ChipModel::Mos6581 => 0.7,
            ChipModel::Mos8580 => 1.0,
        };
        let mut amp_mod = [0i8; 256];
        for (i, a) in amp_mod.iter_mut().enumerate() {
            *a = ((i as f64 - 128.0) * gain) as i8;
        }

        Self {
            low_pass,
            band_pass,
            resonance,
            amp_mod,
        }
    }

    /// Low-pass cutoff coefficient for an 11-bit cutoff value
    pub fn low_pass(&self, cutoff: u16) -> f32 {
        self.low_pass[usize::from(cutoff) & (CUTOFF_STEPS - 1)]
    }

    /// Band-pass cutoff coefficient for an 11-bit cutoff value
    pub fn band_pass(&self, cutoff: u16) -> f32 {
        self.band_pass[usize::from(cutoff) & (CUTOFF_STEPS - 1)]
    }

    /// Resonance coefficient for a 4-bit resonance value
    pub fn resonance(&self, resonance: u8) -> f32 {
        self.resonance[usize::from(resonance & 0x0F)]
    }

    /// Output amplifier curve, centred on zero
    pub fn amp_mod(&self, level: u8) -> i8 {
        self.amp_mod[usize::from(level)]
    }
}

/// Integrator state of one voice's filter channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterChannel {
    #[serde(with = "float_bits")]
    low: f32,
    #[serde(with = "float_bits")]
    reference: f32,
    io: i8,
}

impl FilterChannel {
    /// Low-pass integrator
    pub fn low(&self) -> f32 {
        self.low
    }

    /// Reference (band) integrator
    pub fn reference(&self) -> f32 {
        self.reference
    }

    /// One step of the recurrence on `self.io`
    fn run(&mut self, mode: u8, cutoff: f32, resonance: f32) {
        match mode {
            0x00 => self.io = 0,
            0x20 => {
                self.low += self.reference * cutoff;
                self.reference +=
                    (f32::from(self.io) - self.low - self.reference * resonance) * cutoff;
                self.io = (self.reference - self.low / 4.0) as i8;
            }
            0x40 => {
                // Scaled in double precision
                let scaled = f64::from(self.reference * cutoff) * 0.1;
                self.low = (f64::from(self.low) + scaled) as f32;
                self.reference +=
                    (f32::from(self.io) - self.low - self.reference * resonance) * cutoff;
                let out = self.reference - f32::from(self.io / 8);
                self.io = out.clamp(-128.0, 127.0) as i8;
            }
            _ => {
                self.low += self.reference * cutoff;
                let input = f32::from(self.io);
                let mut high = input - self.low;
                let high_int = high as i32;
                high -= self.reference * resonance;
                self.reference += high * cutoff;
                self.io = match mode {
                    0x10 | 0x30 => self.low as i8,
                    0x60 => high_int as i8,
                    _ => (input - (high_int >> 1) as f32) as i8,
                };
            }
        }
    }
}

/// Persistent filter state: one channel per voice and the active mode
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    /// Per-voice integrators
    pub channels: [FilterChannel; NUM_VOICES],
    /// Mode bits the integrators were last run with
    pub mode: u8,
}

/// Filter and mixer of one engine
#[derive(Debug, Clone)]
pub struct Filter {
    tables: FilterTables,
    state: FilterState,
    cutoff: f32,
    resonance: f32,
    routing: [bool; NUM_VOICES],
    voice3_enabled: bool,
    volume: u8,
    dirty: bool,
}

impl Filter {
    /// Create a filter for a sample rate and chip revision
    pub fn new(sample_rate: u32, model: ChipModel) -> Self {
        Self {
            tables: FilterTables::new(sample_rate, model),
            state: FilterState::default(),
            cutoff: 0.0,
            resonance: 1.0,
            routing: [false; NUM_VOICES],
            voice3_enabled: true,
            volume: 0,
            dirty: true,
        }
    }

    /// Rebuild the amplifier curve for another chip revision
    pub fn set_model(&mut self, sample_rate: u32, model: ChipModel) {
        self.tables = FilterTables::new(sample_rate, model);
        self.dirty = true;
    }

    /// Clear the integrators
    pub fn reset(&mut self) {
        self.state = FilterState::default();
        self.dirty = true;
    }

    /// Mark the chip-wide registers as changed
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether `$15-$18` changed since the last [`Filter::prepare`]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Re-derive coefficients from the chip-wide registers
    ///
    /// Switching to another mode clears the integrators.
    pub fn prepare(&mut self, registers: &RegisterBank) {
        let mode_bits = registers.filter_mode();
        let mode = mode_bits.bits() & MODE_MASK;
        if mode != self.state.mode {
            log::trace!("filter mode {:#04x} -> {:#04x}, clearing integrators", self.state.mode, mode);
            self.state.channels = Default::default();
            self.state.mode = mode;
        }

        let cutoff = registers.filter_cutoff();
        self.cutoff = if mode == FilterMode::BAND_PASS.bits() {
            self.tables.band_pass(cutoff)
        } else {
            self.tables.low_pass(cutoff)
        };
        self.resonance = (self.tables.resonance(registers.resonance()) - self.cutoff).max(1.0);
        self.routing = registers.filter_routing();
        self.voice3_enabled = !(mode_bits.contains(FilterMode::VOICE3_OFF) && !self.routing[2]);
        self.volume = registers.volume();
        self.dirty = false;
    }

    /// Whether voice 3 reaches the mixer
    pub fn voice3_enabled(&self) -> bool {
        self.voice3_enabled
    }

    /// Mix three voice outputs into one sample
    ///
    /// `outputs` are envelope-scaled oscillator values (30 bits). With
    /// `emulate` false the voices bypass the amplifier curve and the filter.
    pub fn apply(&mut self, outputs: [u32; NUM_VOICES], emulate: bool) -> i16 {
        let mut outputs = outputs;
        if !self.voice3_enabled {
            outputs[2] = 0;
        }

        if emulate {
            for (i, output) in outputs.iter_mut().enumerate() {
                let channel = &mut self.state.channels[i];
                channel.io = self.tables.amp_mod((*output >> 22) as u8);
                if self.routing[i] {
                    channel.run(self.state.mode, self.cutoff, self.resonance);
                }
                *output = ((i32::from(channel.io) + 0x80) as u32) << 22;
            }
        }

        let sum = outputs.iter().fold(0u32, |acc, &o| acc.wrapping_add(o));
        (((sum >> 20) as i32 - MIX_OFFSET) * i32::from(self.volume)) as i16
    }

    /// Persistent state for snapshots
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Restore persistent state; coefficients are re-derived on the next sample
    pub fn set_state(&mut self, state: FilterState) {
        self.state = state;
        self.dirty = true;
    }
}
