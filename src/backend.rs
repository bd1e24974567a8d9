//! Backend trait abstraction for SID chip implementations
//!
//! Hosts (players, machine emulators, exporters) drive the chip through this
//! interface so that the table-driven engine in [`crate::sid`] can be swapped
//! for another implementation without touching the host.

use crate::Result;

/// Common interface for SID chip backends
///
/// # Example
///
/// ```
/// use sid6581::{Sid, SidBackend, SidConfig};
///
/// fn play_note<B: SidBackend>(chip: &mut B) -> sid6581::Result<Vec<i16>> {
///     chip.write_register(0x00, 0x25); // Voice 1 frequency low
///     chip.write_register(0x01, 0x1D); // Voice 1 frequency high
///     chip.write_register(0x06, 0xF0); // Sustain 15
///     chip.write_register(0x18, 0x0F); // Master volume
///     chip.write_register(0x04, 0x11); // Triangle + gate
///
///     chip.generate_samples(882)
/// }
///
/// let mut sid = Sid::with_model(SidConfig::pal()).unwrap();
/// let frame = play_note(&mut sid).unwrap();
/// assert_eq!(frame.len(), 882);
/// ```
pub trait SidBackend: Send {
    /// Create a backend with a custom chip clock and sample rate
    ///
    /// # Arguments
    ///
    /// * `clock_frequency` - System clock driving the chip, in Hz
    /// * `sample_rate` - Audio output sample rate in Hz
    ///
    /// # Errors
    ///
    /// Fails when the two rates cannot be combined (see [`crate::SidConfig::validate`]).
    fn with_clocks(clock_frequency: u32, sample_rate: u32) -> Result<Self>
    where
        Self: Sized;

    /// Reset the backend to its power-on state
    ///
    /// Clears all registers, voices and filter state.
    fn reset(&mut self);

    /// Write to a SID register
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address (0x00-0x1F, higher bits ignored)
    /// * `value` - Register value
    fn write_register(&mut self, addr: u8, value: u8);

    /// Read from a SID register
    ///
    /// # Returns
    ///
    /// The value the CPU would read at `addr`
    fn read_register(&self, addr: u8) -> u8;

    /// Dump the 32-byte register image
    fn dump_registers(&self) -> [u8; 32];

    /// Compute the next output sample
    ///
    /// # Errors
    ///
    /// Fails when the backend is not ready to produce audio, e.g. no chip
    /// model was selected.
    fn compute_sample(&mut self) -> Result<i16>;

    /// Get the last computed sample
    ///
    /// # Returns
    ///
    /// Normalized audio sample in range [-1.0, 1.0]
    fn get_sample(&self) -> f32;

    /// Generate multiple audio samples
    ///
    /// # Arguments
    ///
    /// * `count` - Number of samples to generate
    fn generate_samples(&mut self, count: usize) -> Result<Vec<i16>> {
        let mut samples = vec![0; count];
        self.generate_samples_into(&mut samples)?;
        Ok(samples)
    }

    /// Generate multiple audio samples into a caller-provided buffer
    ///
    /// This avoids per-call allocations; prefer this in hot paths.
    fn generate_samples_into(&mut self, buffer: &mut [i16]) -> Result<()> {
        for sample in buffer.iter_mut() {
            *sample = self.compute_sample()?;
        }
        Ok(())
    }

    /// Mute or unmute a voice
    ///
    /// # Arguments
    ///
    /// * `voice` - Voice index (0-2)
    /// * `mute` - true to mute, false to unmute
    fn set_voice_mute(&mut self, voice: usize, mute: bool);

    /// Check if a voice is muted
    fn is_voice_muted(&self, voice: usize) -> bool;
}
