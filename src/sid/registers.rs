//! SID Register Definitions
//!
//! The chip decodes 32 addresses. Each voice owns seven consecutive
//! registers (frequency, pulse width, control, envelope), the filter and
//! master volume occupy `$15-$18`, and `$19-$1C` are the read-only paddle,
//! oscillator 3 and envelope 3 ports. `$1D-$1F` are unused.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decoded register addresses
pub const NUM_REGISTERS: usize = 32;

/// Number of registers owned by each voice
pub const VOICE_REGISTERS: usize = 7;

/// Number of voices
pub const NUM_VOICES: usize = 3;

/// SID Register Address (offsets are for voice 1; voices 2 and 3 add 7 and 14)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Oscillator frequency (low byte) - $00
    FreqLo = 0x00,
    /// Oscillator frequency (high byte) - $01
    FreqHi = 0x01,
    /// Pulse width (low byte) - $02
    PulseWidthLo = 0x02,
    /// Pulse width (high nibble) - $03
    PulseWidthHi = 0x03,
    /// Control: waveform, test, ring mod, sync, gate - $04
    Control = 0x04,
    /// Attack (high nibble) / decay (low nibble) - $05
    AttackDecay = 0x05,
    /// Sustain (high nibble) / release (low nibble) - $06
    SustainRelease = 0x06,
    /// Filter cutoff (low 3 bits) - $15
    FilterCutoffLo = 0x15,
    /// Filter cutoff (high 8 bits) - $16
    FilterCutoffHi = 0x16,
    /// Resonance (high nibble) / voice routing (low nibble) - $17
    ResonanceRouting = 0x17,
    /// Voice 3 off, filter mode, master volume - $18
    ModeVolume = 0x18,
    /// Paddle X (read only) - $19
    PotX = 0x19,
    /// Paddle Y (read only) - $1A
    PotY = 0x1A,
    /// Oscillator 3 output (read only) - $1B
    Osc3 = 0x1B,
    /// Envelope 3 output (read only) - $1C
    Env3 = 0x1C,
}

impl Register {
    /// Decode an address into the voice it belongs to and its per-voice register
    ///
    /// Returns `None` for chip-wide and unused addresses.
    pub fn voice_register(addr: u8) -> Option<(usize, Register)> {
        let addr = addr as usize & (NUM_REGISTERS - 1);
        if addr >= NUM_VOICES * VOICE_REGISTERS {
            return None;
        }
        let reg = match addr % VOICE_REGISTERS {
            0 => Register::FreqLo,
            1 => Register::FreqHi,
            2 => Register::PulseWidthLo,
            3 => Register::PulseWidthHi,
            4 => Register::Control,
            5 => Register::AttackDecay,
            _ => Register::SustainRelease,
        };
        Some((addr / VOICE_REGISTERS, reg))
    }

    /// Decode a chip-wide address (`$15-$1C`)
    pub fn chip_register(addr: u8) -> Option<Register> {
        match addr as usize & (NUM_REGISTERS - 1) {
            0x15 => Some(Register::FilterCutoffLo),
            0x16 => Some(Register::FilterCutoffHi),
            0x17 => Some(Register::ResonanceRouting),
            0x18 => Some(Register::ModeVolume),
            0x19 => Some(Register::PotX),
            0x1A => Some(Register::PotY),
            0x1B => Some(Register::Osc3),
            0x1C => Some(Register::Env3),
            _ => None,
        }
    }

    /// Get the register offset (voice 1 / chip-wide address)
    pub fn addr(&self) -> u8 {
        *self as u8
    }

    /// Whether the CPU can only read this register
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Register::PotX | Register::PotY | Register::Osc3 | Register::Env3
        )
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::FreqLo => write!(f, "FREQ LO"),
            Register::FreqHi => write!(f, "FREQ HI"),
            Register::PulseWidthLo => write!(f, "PW LO"),
            Register::PulseWidthHi => write!(f, "PW HI"),
            Register::Control => write!(f, "CONTROL"),
            Register::AttackDecay => write!(f, "ATTACK/DECAY"),
            Register::SustainRelease => write!(f, "SUSTAIN/RELEASE"),
            Register::FilterCutoffLo => write!(f, "$15 (Filter Cutoff Low)"),
            Register::FilterCutoffHi => write!(f, "$16 (Filter Cutoff High)"),
            Register::ResonanceRouting => write!(f, "$17 (Resonance/Routing)"),
            Register::ModeVolume => write!(f, "$18 (Mode/Volume)"),
            Register::PotX => write!(f, "$19 (Paddle X)"),
            Register::PotY => write!(f, "$1A (Paddle Y)"),
            Register::Osc3 => write!(f, "$1B (Oscillator 3)"),
            Register::Env3 => write!(f, "$1C (Envelope 3)"),
        }
    }
}

bitflags! {
    /// Voice control register bitflags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlFlags: u8 {
        /// Envelope gate (1 = attack/decay/sustain, 0 = release)
        const GATE = 0x01;
        /// Hard sync with the previous voice
        const SYNC = 0x02;
        /// Ring modulate triangle with the previous voice
        const RING_MOD = 0x04;
        /// Hold oscillator at zero, reseed noise
        const TEST = 0x08;
        /// Triangle waveform
        const TRIANGLE = 0x10;
        /// Sawtooth waveform
        const SAWTOOTH = 0x20;
        /// Pulse waveform
        const PULSE = 0x40;
        /// Noise waveform
        const NOISE = 0x80;
    }
}

impl ControlFlags {
    /// Waveform select nibble (0-15)
    #[inline]
    pub fn waveform(&self) -> u8 {
        self.bits() >> 4
    }
}

bitflags! {
    /// Mode/volume register ($18) bitflags, excluding the volume nibble
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FilterMode: u8 {
        /// Low-pass output
        const LOW_PASS = 0x10;
        /// Band-pass output
        const BAND_PASS = 0x20;
        /// High-pass output
        const HIGH_PASS = 0x40;
        /// Disconnect voice 3 from the output
        const VOICE3_OFF = 0x80;
    }
}

/// Raw register image (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBank {
    /// Register values $00-$1F
    pub registers: [u8; NUM_REGISTERS],
}

impl RegisterBank {
    /// Create a new register bank with all values set to 0
    pub fn new() -> Self {
        RegisterBank {
            registers: [0; NUM_REGISTERS],
        }
    }

    /// Read a register value
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.registers[addr as usize & (NUM_REGISTERS - 1)]
    }

    /// Write a register value
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        self.registers[addr as usize & (NUM_REGISTERS - 1)] = value;
    }

    /// The seven registers of a voice (0-2), `None` for any other index
    #[inline]
    pub fn voice(&self, voice: usize) -> Option<[u8; VOICE_REGISTERS]> {
        if voice >= NUM_VOICES {
            return None;
        }
        let base = voice * VOICE_REGISTERS;
        let mut regs = [0; VOICE_REGISTERS];
        regs.copy_from_slice(&self.registers[base..base + VOICE_REGISTERS]);
        Some(regs)
    }

    /// Get all registers as a slice
    pub fn as_slice(&self) -> &[u8; NUM_REGISTERS] {
        &self.registers
    }

    /// 11-bit filter cutoff from $15/$16
    #[inline]
    pub fn filter_cutoff(&self) -> u16 {
        (u16::from(self.registers[0x15]) & 0x07) | (u16::from(self.registers[0x16]) << 3)
    }

    /// 4-bit resonance from $17
    #[inline]
    pub fn resonance(&self) -> u8 {
        self.registers[0x17] >> 4
    }

    /// Per-voice filter routing bits from $17
    #[inline]
    pub fn filter_routing(&self) -> [bool; NUM_VOICES] {
        let bits = self.registers[0x17];
        [bits & 0x01 != 0, bits & 0x02 != 0, bits & 0x04 != 0]
    }

    /// Filter mode and voice 3 disconnect bits from $18
    #[inline]
    pub fn filter_mode(&self) -> FilterMode {
        FilterMode::from_bits_truncate(self.registers[0x18])
    }

    /// Master volume nibble from $18
    #[inline]
    pub fn volume(&self) -> u8 {
        self.registers[0x18] & 0x0F
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}
