//! WAV file export

use super::{apply_fade_out, normalize_samples, ExportConfig};
use crate::{Result, Sid, SidError};
use std::path::Path;

/// Render `sample_count` samples from the engine into a mono WAV file
///
/// The file uses the engine's configured sample rate.
///
/// # Errors
///
/// Fails if the engine has no chip model selected or the file cannot be written.
pub fn export_to_wav<P: AsRef<Path>>(sid: &mut Sid, output_path: P, sample_count: usize) -> Result<()> {
    export_to_wav_with_config(sid, output_path, sample_count, ExportConfig::default())
}

/// Render `sample_count` samples into a WAV file with custom configuration
///
/// # Arguments
///
/// * `sid` - Engine to render from (continues from its current state)
/// * `output_path` - Path where the WAV file will be written
/// * `sample_count` - Number of samples per channel
/// * `config` - Channel count, normalization and fade out
pub fn export_to_wav_with_config<P: AsRef<Path>>(
    sid: &mut Sid,
    output_path: P,
    sample_count: usize,
    config: ExportConfig,
) -> Result<()> {
    let sample_rate = sid.config().sample_rate;
    log::info!(
        "rendering {sample_count} samples ({:.1}s)",
        sample_count as f32 / sample_rate as f32
    );
    let rendered = sid.generate_samples(sample_count)?;
    let mut samples: Vec<f32> = rendered
        .iter()
        .map(|&s| f32::from(s) / f32::from(i16::MAX))
        .collect();

    if config.normalize {
        normalize_samples(&mut samples);
    }
    if config.fade_out_duration > 0.0 {
        apply_fade_out(&mut samples, config.fade_out_duration, sample_rate);
    }

    let final_samples = if config.channels == 2 {
        mono_to_stereo(&samples)
    } else {
        samples
    };

    log::info!("writing WAV file to {}", output_path.as_ref().display());
    write_wav_file(output_path.as_ref(), &final_samples, sample_rate, config.channels)
}

/// Write raw engine samples to a mono 16-bit WAV file
pub fn write_wav<P: AsRef<Path>>(output_path: P, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output_path.as_ref(), spec).map_err(wav_error)?;
    for &sample in samples {
        writer.write_sample(sample).map_err(wav_error)?;
    }
    writer.finalize().map_err(wav_error)
}

/// Convert mono samples to stereo (duplicate each sample)
fn mono_to_stereo(mono: &[f32]) -> Vec<f32> {
    let mut stereo = Vec::with_capacity(mono.len() * 2);
    for &sample in mono {
        stereo.push(sample);
        stereo.push(sample);
    }
    stereo
}

fn write_wav_file(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(wav_error)?;
    for &sample in samples {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(sample_i16).map_err(wav_error)?;
    }
    writer.finalize().map_err(wav_error)
}

fn wav_error(e: hound::Error) -> SidError {
    match e {
        hound::Error::IoError(io) => SidError::Io(io),
        other => SidError::AudioFileError(other.to_string()),
    }
}
