//! Voice: oscillator, waveform selection and envelope of one SID channel
//!
//! A voice keeps its own copy of its seven registers. Writes mark it dirty
//! and [`Voice::prepare`] re-derives the oscillator step, pulse threshold and
//! active waveform before the next sample. Gate changes are latched at write
//! time and resolved by [`Voice::advance_envelope`].
//!
//! Voices never reference each other. Per sample the chip engine advances
//! all three accumulators with [`Voice::clock_phase`], applies hard sync with
//! [`Voice::hard_sync`] and then reads each output with [`Voice::tick`],
//! passing in the accumulator of the ring modulation source.

use serde::{Deserialize, Serialize};

use super::envelope::{AdsrSettings, Envelope, EnvelopePhase, EnvelopeRates};
use super::noise::NoiseGenerator;
use super::registers::{ControlFlags, Register, VOICE_REGISTERS};
use super::wave_tables::{WaveTables, Waveform, FULL_SCALE};
use crate::config::ChipModel;

/// Accumulator bit that drives ring modulation of the next voice
const ACCUMULATOR_MSB: u32 = 0x8000_0000;

/// One SID voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    registers: [u8; VOICE_REGISTERS],
    accumulator: u32,
    step: u32,
    pulse_threshold: u32,
    waveform: Waveform,
    ring: bool,
    noise: NoiseGenerator,
    envelope: Envelope,
    oscillator: u16,
    dirty: bool,
    envelope_pending: bool,
    gate_flip: bool,
}

impl Voice {
    /// Power-on voice: registers cleared, noise seeded, envelope idle
    pub fn new() -> Self {
        Self {
            registers: [0; VOICE_REGISTERS],
            accumulator: 0,
            step: 0,
            pulse_threshold: 0,
            waveform: Waveform::Silent,
            ring: false,
            noise: NoiseGenerator::new(),
            envelope: Envelope::new(),
            oscillator: 0,
            dirty: true,
            envelope_pending: true,
            gate_flip: false,
        }
    }

    /// Return to the power-on state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Store a register write
    ///
    /// Nothing is re-derived here; the write takes effect with the next
    /// sample. Toggling the gate bit is remembered so that an off/on pair
    /// between two samples still restarts the attack.
    pub fn write(&mut self, register: Register, value: u8) {
        let index = register.addr() as usize;
        if index >= VOICE_REGISTERS {
            return;
        }
        if register == Register::Control
            && (self.registers[index] ^ value) & ControlFlags::GATE.bits() != 0
        {
            self.gate_flip = true;
        }
        self.registers[index] = value;
        self.dirty = true;
        self.envelope_pending = true;
    }

    /// Whether a register changed since the last [`Voice::prepare`]
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force re-derivation of all register-dependent state
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
        self.envelope_pending = true;
    }

    /// Re-derive oscillator state from the registers
    ///
    /// `speed` is the phase step per unit of frequency register. Calling this
    /// again without an intervening write leaves the voice unchanged.
    pub fn prepare(&mut self, model: ChipModel, speed: u32) {
        let control = self.control();
        self.step = speed.wrapping_mul(u32::from(self.frequency()));
        self.waveform = Waveform::from_select(control.waveform());
        self.pulse_threshold = u32::from(self.pulse_width());

        if control.contains(ControlFlags::TEST) {
            // Oscillator held at zero, noise register reloaded
            self.accumulator = 0;
            self.step = 0;
            self.noise.reseed();
            if self.waveform == Waveform::Pulse {
                self.pulse_threshold = 0;
            }
        }

        self.ring = control.contains(ControlFlags::RING_MOD) && self.waveform.ring_modulates(model);
        self.dirty = false;
    }

    /// Advance the accumulator by one sample
    ///
    /// Returns `true` when the accumulator wrapped, i.e. the oscillator
    /// completed a cycle. The noise register is shifted for each wrap.
    #[inline]
    pub fn clock_phase(&mut self) -> bool {
        self.accumulator = self.accumulator.wrapping_add(self.step);
        let overflow = self.accumulator < self.step;
        if overflow {
            self.noise.clock_cycle();
        }
        overflow
    }

    /// Restart the oscillator because the sync source wrapped
    ///
    /// Shifts owed to the noise register for the partial cycle are committed
    /// first.
    #[inline]
    pub fn hard_sync(&mut self) {
        self.noise.clock(self.accumulator >> 28);
        self.accumulator = 0;
    }

    /// 15-bit oscillator output for the current phase
    ///
    /// `ring_source` is the accumulator of the voice feeding ring modulation
    /// (voice 3 for voice 1, voice 1 for voice 2, voice 2 for voice 3).
    pub fn oscillator_output(&self, tables: &WaveTables, ring_source: u32) -> u16 {
        let phase = (self.accumulator >> 20) as usize;
        let value = match self.waveform {
            Waveform::Silent => 0,
            Waveform::Noise => u16::from(self.noise.sample(self.accumulator >> 28)) << 7,
            waveform if waveform.has_pulse() => {
                if phase as u32 >= self.pulse_threshold {
                    tables.sample(waveform, phase)
                } else {
                    0
                }
            }
            waveform => tables.sample(waveform, phase),
        };
        if self.ring && ring_source & ACCUMULATOR_MSB != 0 {
            value ^ FULL_SCALE
        } else {
            value
        }
    }

    /// Read the oscillator for this sample and remember it
    #[inline]
    pub fn tick(&mut self, tables: &WaveTables, ring_source: u32) -> u16 {
        self.oscillator = self.oscillator_output(tables, ring_source);
        self.oscillator
    }

    /// Resolve pending gate changes and step the envelope once
    pub fn advance_envelope(&mut self, rates: &EnvelopeRates) {
        if self.envelope_pending {
            self.envelope
                .update_gate(self.gate(), self.gate_flip, self.adsr(), rates);
            self.envelope_pending = false;
            self.gate_flip = false;
        }
        self.envelope.clock(rates);
    }

    /// 15-bit envelope amplitude
    #[inline]
    pub fn amplitude(&self) -> u32 {
        self.envelope.amplitude()
    }

    /// 16-bit frequency register
    #[inline]
    pub fn frequency(&self) -> u16 {
        u16::from_le_bytes([self.registers[0], self.registers[1]])
    }

    /// 12-bit pulse width register
    #[inline]
    pub fn pulse_width(&self) -> u16 {
        u16::from_le_bytes([self.registers[2], self.registers[3] & 0x0F])
    }

    /// Control register
    #[inline]
    pub fn control(&self) -> ControlFlags {
        ControlFlags::from_bits_truncate(self.registers[4])
    }

    /// Gate bit
    pub fn gate(&self) -> bool {
        self.control().contains(ControlFlags::GATE)
    }

    /// Sync bit
    pub fn sync(&self) -> bool {
        self.control().contains(ControlFlags::SYNC)
    }

    /// Ring modulation bit
    pub fn ring_mod(&self) -> bool {
        self.control().contains(ControlFlags::RING_MOD)
    }

    /// Test bit
    pub fn test(&self) -> bool {
        self.control().contains(ControlFlags::TEST)
    }

    /// Waveform selected by the control register
    pub fn waveform(&self) -> Waveform {
        Waveform::from_select(self.control().waveform())
    }

    /// Envelope register nibbles
    pub fn adsr(&self) -> AdsrSettings {
        AdsrSettings::from_registers(self.registers[5], self.registers[6])
    }

    /// Attack rate code
    pub fn attack(&self) -> u8 {
        self.registers[5] >> 4
    }

    /// Decay rate code
    pub fn decay(&self) -> u8 {
        self.registers[5] & 0x0F
    }

    /// Sustain level
    pub fn sustain(&self) -> u8 {
        self.registers[6] >> 4
    }

    /// Release rate code
    pub fn release(&self) -> u8 {
        self.registers[6] & 0x0F
    }

    /// Phase accumulator
    #[inline]
    pub fn accumulator(&self) -> u32 {
        self.accumulator
    }

    /// Oscillator value returned by the last [`Voice::tick`]
    pub fn oscillator(&self) -> u16 {
        self.oscillator
    }

    /// Envelope state
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Envelope phase
    pub fn envelope_phase(&self) -> EnvelopePhase {
        self.envelope.phase()
    }

    /// Noise shift register
    pub fn noise(&self) -> &NoiseGenerator {
        &self.noise
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}
