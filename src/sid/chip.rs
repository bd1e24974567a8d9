//! SID chip engine
//!
//! Owns the register image, the three voices and the filter, and produces
//! one output sample per [`Sid::compute_sample`] call:
//!
//! 1. voices and filter re-derive state from changed registers
//! 2. envelopes resolve gate changes and step once
//! 3. all three accumulators advance; a wrap hard-syncs the next voice if
//!    its SYNC bit is set
//! 4. each oscillator is read (ring modulation uses the previous voice's
//!    accumulator) and scaled by its envelope
//! 5. the filter mixes the three contributions
//!
//! Voice `n` is synced and ring modulated by voice `n - 1`, voice 1 by voice 3.

use std::sync::Arc;

use super::envelope::{EnvelopePhase, EnvelopeRates};
use super::filter::Filter;
use super::registers::{Register, RegisterBank, NUM_VOICES};
use super::voice::Voice;
use super::wave_tables::WaveTables;
use crate::backend::SidBackend;
use crate::config::{ChipModel, SidConfig};
use crate::{Result, SidError};

/// Value read from the unconnected paddle ports
const POT_IDLE: u8 = 0xFF;

/// Source voice for sync and ring modulation
#[inline]
const fn source_of(voice: usize) -> usize {
    (voice + NUM_VOICES - 1) % NUM_VOICES
}

/// MOS 6581/8580 emulation engine
///
/// Not internally synchronised: register writes and sample computation on
/// one instance must come from one thread at a time. A write is heard from
/// the first sample computed after it.
#[derive(Debug, Clone)]
pub struct Sid {
    pub(super) config: SidConfig,
    pub(super) speed: u32,
    pub(super) rates: EnvelopeRates,
    pub(super) tables: Option<Arc<WaveTables>>,
    pub(super) registers: RegisterBank,
    pub(super) voices: [Voice; NUM_VOICES],
    pub(super) filter: Filter,
    pub(super) outputs: [u32; NUM_VOICES],
    pub(super) muted: [bool; NUM_VOICES],
    pub(super) bus_latch: u8,
    pub(super) last_sample: i16,
}

impl Sid {
    /// Create an engine with no chip model selected
    ///
    /// [`Sid::initialize`] must be called before samples can be computed.
    ///
    /// # Errors
    ///
    /// Returns [`SidError::ConfigError`] if the configuration is invalid.
    pub fn new(config: SidConfig) -> Result<Self> {
        if let Err(e) = config.validate() {
            log::debug!("rejecting SID configuration {config:?}: {e}");
            return Err(e);
        }
        let speed = config.speed();
        Ok(Self {
            config,
            speed,
            rates: EnvelopeRates::new(speed),
            tables: None,
            registers: RegisterBank::new(),
            voices: [Voice::new(), Voice::new(), Voice::new()],
            filter: Filter::new(config.sample_rate, config.model),
            outputs: [0; NUM_VOICES],
            muted: [false; NUM_VOICES],
            bus_latch: 0,
            last_sample: 0,
        })
    }

    /// Create an engine and select `config.model` right away
    ///
    /// # Errors
    ///
    /// Returns [`SidError::ConfigError`] if the configuration is invalid.
    pub fn with_model(config: SidConfig) -> Result<Self> {
        let mut sid = Self::new(config)?;
        sid.initialize(config.model);
        Ok(sid)
    }

    /// Select the chip revision
    ///
    /// Attaches the shared wave tables for `model` (building them on first
    /// use) and re-derives all register-dependent state. Voice and filter
    /// state is kept, so the model can be switched mid-stream.
    pub fn initialize(&mut self, model: ChipModel) {
        log::debug!(
            "initializing {model} at {} Hz clock, {} Hz output",
            self.config.clock_frequency,
            self.config.sample_rate
        );
        self.tables = Some(WaveTables::initialize(model));
        self.config.model = model;
        self.filter.set_model(self.config.sample_rate, model);
        for voice in &mut self.voices {
            voice.mark_dirty();
        }
    }

    /// Whether a chip model has been selected
    pub fn is_initialized(&self) -> bool {
        self.tables.is_some()
    }

    /// Selected chip model, if any
    pub fn model(&self) -> Option<ChipModel> {
        self.tables.as_ref().map(|t| t.model())
    }

    /// Engine configuration
    pub fn config(&self) -> &SidConfig {
        &self.config
    }

    /// Write a register (`addr` is masked to 0-31)
    pub fn write_register(&mut self, addr: u8, value: u8) {
        let addr = addr & 0x1F;
        self.bus_latch = value;
        self.registers.write(addr, value);

        if let Some((voice, register)) = Register::voice_register(addr) {
            self.voices[voice].write(register, value);
            return;
        }
        match Register::chip_register(addr) {
            Some(register) if register.is_read_only() => {
                log::trace!("write {value:#04x} to read-only register {register}");
            }
            Some(_) => self.filter.mark_dirty(),
            None => {}
        }
    }

    /// Read a register as the CPU would see it
    ///
    /// The paddle ports read `$FF`, `$1B` and `$1C` expose voice 3's
    /// oscillator and envelope, and write-only registers return the last
    /// value written to the chip.
    pub fn read_register(&self, addr: u8) -> u8 {
        match Register::chip_register(addr) {
            Some(Register::PotX | Register::PotY) => POT_IDLE,
            Some(Register::Osc3) => self.tables.as_deref().map_or(0, |tables| {
                let voice = &self.voices[2];
                let source = self.voices[source_of(2)].accumulator();
                (voice.oscillator_output(tables, source) >> 7) as u8
            }),
            Some(Register::Env3) => self.voices[2].envelope().level(),
            _ => self.bus_latch,
        }
    }

    /// Register image
    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    /// Compute the next output sample
    ///
    /// # Errors
    ///
    /// Returns [`SidError::NotInitialized`] if no chip model was selected.
    pub fn compute_sample(&mut self) -> Result<i16> {
        let tables = self.tables.as_deref().ok_or(SidError::NotInitialized)?;
        let model = tables.model();

        for voice in &mut self.voices {
            if voice.is_dirty() {
                voice.prepare(model, self.speed);
            }
            voice.advance_envelope(&self.rates);
        }
        if self.filter.is_dirty() {
            self.filter.prepare(&self.registers);
        }

        let mut synced = [false; NUM_VOICES];
        for i in 0..NUM_VOICES {
            if self.voices[i].clock_phase() {
                let target = (i + 1) % NUM_VOICES;
                synced[target] = self.voices[target].sync();
            }
        }
        for (voice, synced) in self.voices.iter_mut().zip(synced) {
            if synced {
                voice.hard_sync();
            }
        }

        for i in 0..NUM_VOICES {
            let source = self.voices[source_of(i)].accumulator();
            let voice = &mut self.voices[i];
            let oscillator = u32::from(voice.tick(tables, source));
            self.outputs[i] = if self.muted[i] {
                0
            } else {
                voice.amplitude() * oscillator
            };
        }

        self.last_sample = self.filter.apply(self.outputs, self.config.filter_enabled);
        Ok(self.last_sample)
    }

    /// Compute `count` samples
    ///
    /// # Errors
    ///
    /// Returns [`SidError::NotInitialized`] if no chip model was selected.
    pub fn generate_samples(&mut self, count: usize) -> Result<Vec<i16>> {
        let mut samples = vec![0; count];
        self.generate_samples_into(&mut samples)?;
        Ok(samples)
    }

    /// Fill `buffer` with consecutive samples
    ///
    /// # Errors
    ///
    /// Returns [`SidError::NotInitialized`] if no chip model was selected;
    /// the buffer is left untouched in that case.
    pub fn generate_samples_into(&mut self, buffer: &mut [i16]) -> Result<()> {
        if self.tables.is_none() {
            return Err(SidError::NotInitialized);
        }
        for sample in buffer.iter_mut() {
            *sample = self.compute_sample()?;
        }
        Ok(())
    }

    /// Last sample returned by [`Sid::compute_sample`]
    pub fn last_sample(&self) -> i16 {
        self.last_sample
    }

    /// Power-on reset
    ///
    /// Clears registers, voices (noise registers are reseeded) and filter
    /// integrators. The selected model and mute settings are kept.
    pub fn reset(&mut self) {
        log::debug!("SID reset");
        self.registers = RegisterBank::new();
        for voice in &mut self.voices {
            voice.reset();
        }
        self.filter.reset();
        self.outputs = [0; NUM_VOICES];
        self.bus_latch = 0;
        self.last_sample = 0;
    }

    /// Mute or unmute a voice (0-2)
    pub fn set_voice_mute(&mut self, voice: usize, mute: bool) {
        if let Some(m) = self.muted.get_mut(voice) {
            *m = mute;
        }
    }

    /// Whether a voice (0-2) is muted
    pub fn is_voice_muted(&self, voice: usize) -> bool {
        self.muted.get(voice).copied().unwrap_or(false)
    }

    /// Voice state (0-2)
    pub fn voice(&self, voice: usize) -> Option<&Voice> {
        self.voices.get(voice)
    }

    /// Envelope-scaled output of a voice in the last sample (30 bits)
    pub fn voice_output(&self, voice: usize) -> u32 {
        self.outputs.get(voice).copied().unwrap_or(0)
    }

    /// 8-bit envelope level of a voice
    pub fn envelope_level(&self, voice: usize) -> u8 {
        self.voices.get(voice).map_or(0, |v| v.envelope().level())
    }

    /// Envelope phase of a voice
    pub fn envelope_phase(&self, voice: usize) -> EnvelopePhase {
        self.voices
            .get(voice)
            .map_or(EnvelopePhase::Idle, |v| v.envelope_phase())
    }

    /// Filter and mixer
    pub fn filter(&self) -> &Filter {
        &self.filter
    }
}

impl SidBackend for Sid {
    fn with_clocks(clock_frequency: u32, sample_rate: u32) -> Result<Self> {
        Sid::with_model(
            SidConfig::default()
                .with_clock_frequency(clock_frequency)
                .with_sample_rate(sample_rate),
        )
    }

    fn reset(&mut self) {
        Sid::reset(self);
    }

    fn write_register(&mut self, addr: u8, value: u8) {
        Sid::write_register(self, addr, value);
    }

    fn read_register(&self, addr: u8) -> u8 {
        Sid::read_register(self, addr)
    }

    fn dump_registers(&self) -> [u8; 32] {
        *self.registers.as_slice()
    }

    fn compute_sample(&mut self) -> Result<i16> {
        Sid::compute_sample(self)
    }

    fn get_sample(&self) -> f32 {
        f32::from(self.last_sample) / f32::from(i16::MAX)
    }

    fn generate_samples_into(&mut self, buffer: &mut [i16]) -> Result<()> {
        Sid::generate_samples_into(self, buffer)
    }

    fn set_voice_mute(&mut self, voice: usize, mute: bool) {
        Sid::set_voice_mute(self, voice, mute);
    }

    fn is_voice_muted(&self, voice: usize) -> bool {
        Sid::is_voice_muted(self, voice)
    }
}
