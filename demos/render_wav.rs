//! Render a two-voice sync/ring patch to a WAV file
//!
//! Run with: cargo run --example render_wav --features export-wav -- out.wav

use anyhow::{Context, Result};
use sid6581::export::{export_to_wav_with_config, ExportConfig};
use sid6581::{ChipModel, Sid, SidConfig};

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "sid_demo.wav".to_string());
    let config = SidConfig::pal().with_model(ChipModel::Mos8580);
    let mut sid = Sid::with_model(config)?;

    // Voice 3: slow sawtooth, source for voice 1 sync and ring modulation
    sid.write_register(0x0E, 0x00);
    sid.write_register(0x0F, 0x08);
    // Voice 1: synced triangle with ring modulation
    sid.write_register(0x00, 0x00);
    sid.write_register(0x01, 0x30);
    sid.write_register(0x05, 0x0A);
    sid.write_register(0x06, 0xA8);
    sid.write_register(0x04, 0x17);
    sid.write_register(0x18, 0x0F);

    export_to_wav_with_config(
        &mut sid,
        &path,
        config.sample_rate as usize * 2,
        ExportConfig::default().normalize(true).fade_out(0.5),
    )
    .with_context(|| format!("rendering {path}"))?;

    println!("wrote {path}");
    Ok(())
}
