//! Play a short arpeggio on voice 1 and print per-frame statistics
//!
//! Run with: RUST_LOG=debug cargo run --example chip_demo

use anyhow::Result;
use sid6581::{ChipModel, Sid, SidConfig};

/// PAL frequency register values for C4, E4, G4, C5
const NOTES: [u16; 4] = [0x1125, 0x15A3, 0x19B1, 0x224B];

/// Samples per 50 Hz frame at 44.1 kHz
const FRAME: usize = 882;

fn main() -> Result<()> {
    env_logger::init();

    for model in [ChipModel::Mos6581, ChipModel::Mos8580] {
        let mut sid = Sid::with_model(SidConfig::pal().with_model(model))?;

        sid.write_register(0x02, 0x00);
        sid.write_register(0x03, 0x08); // 50% pulse
        sid.write_register(0x05, 0x09); // Attack 0, decay 9
        sid.write_register(0x06, 0x8A); // Sustain 8, release 10
        sid.write_register(0x16, 0x30); // Cutoff
        sid.write_register(0x17, 0xC1); // Resonance 12, voice 1 filtered
        sid.write_register(0x18, 0x1F); // Low-pass, volume 15

        println!("{model}");
        for (step, &note) in NOTES.iter().cycle().take(12).enumerate() {
            let [lo, hi] = note.to_le_bytes();
            sid.write_register(0x00, lo);
            sid.write_register(0x01, hi);
            sid.write_register(0x04, 0x41); // Pulse + gate

            let frame = sid.generate_samples(FRAME)?;
            sid.write_register(0x04, 0x40); // Gate off

            let peak = frame.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
            let rms = (frame.iter().map(|&s| f64::from(s).powi(2)).sum::<f64>() / FRAME as f64).sqrt();
            println!(
                "  frame {step:2}: note {note:#06x} peak {peak:5} rms {rms:8.1} env {:3} ({})",
                sid.envelope_level(0),
                sid.envelope_phase(0)
            );
        }
    }

    Ok(())
}
