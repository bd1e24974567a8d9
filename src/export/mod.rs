//! Audio export of rendered SID output
//!
//! Renders a number of samples from an engine and writes them to disk.
//! Only WAV (uncompressed PCM via `hound`) is supported.
//!
//! # Examples
//!
//! ```no_run
//! use sid6581::export::export_to_wav;
//! use sid6581::{Sid, SidConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sid = Sid::with_model(SidConfig::pal())?;
//! sid.write_register(0x01, 0x1D);
//! sid.write_register(0x06, 0xF0);
//! sid.write_register(0x18, 0x0F);
//! sid.write_register(0x04, 0x21);
//!
//! export_to_wav(&mut sid, "note.wav", 44_100)?;
//! # Ok(())
//! # }
//! ```

mod wav;
pub use wav::*;

/// Export configuration options
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Whether to normalize audio to prevent clipping
    pub normalize: bool,
    /// Fade out duration in seconds (0 = no fade)
    pub fade_out_duration: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            channels: 1,
            normalize: false,
            fade_out_duration: 0.0,
        }
    }
}

impl ExportConfig {
    /// Create config for stereo export
    pub fn stereo() -> Self {
        Self {
            channels: 2,
            ..Default::default()
        }
    }

    /// Enable normalization to prevent clipping
    pub fn normalize(mut self, enable: bool) -> Self {
        self.normalize = enable;
        self
    }

    /// Add fade out at the end
    pub fn fade_out(mut self, duration_seconds: f32) -> Self {
        self.fade_out_duration = duration_seconds;
        self
    }
}

/// Scale samples so the peak sits at 0.95 full scale
fn normalize_samples(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    if peak > 0.0 {
        let scale = 0.95 / peak;
        for sample in samples.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Apply a linear fade out to the end of the samples
fn apply_fade_out(samples: &mut [f32], fade_duration: f32, sample_rate: u32) {
    if fade_duration <= 0.0 || samples.is_empty() {
        return;
    }

    let fade_samples = ((fade_duration * sample_rate as f32) as usize).max(1);
    let start_fade = samples.len().saturating_sub(fade_samples);

    for (i, sample) in samples.iter_mut().enumerate().skip(start_fade) {
        let progress = (i - start_fade) as f32 / fade_samples as f32;
        *sample *= 1.0 - progress;
    }
}
