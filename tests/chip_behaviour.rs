use sid6581::sid::{EnvelopePhase, Register, Voice, WaveTables, Waveform};
use sid6581::{ChipModel, Sid, SidConfig};

fn pal(model: ChipModel) -> Sid {
    Sid::with_model(SidConfig::pal().with_model(model)).unwrap()
}

fn set_frequency(sid: &mut Sid, voice: u8, freq: u16) {
    let [lo, hi] = freq.to_le_bytes();
    sid.write_register(voice * 7, lo);
    sid.write_register(voice * 7 + 1, hi);
}

fn accumulator_trace(sid: &mut Sid, samples: usize) -> Vec<u32> {
    (0..samples)
        .map(|_| {
            sid.compute_sample().unwrap();
            sid.voice(0).unwrap().accumulator()
        })
        .collect()
}

#[test]
fn accumulator_trajectory_is_reproducible() {
    for freq in [0x0001, 0x00FF, 0x1D25, 0x8000, 0xFFFF] {
        let mut a = pal(ChipModel::Mos6581);
        let mut b = pal(ChipModel::Mos6581);
        set_frequency(&mut a, 0, freq);
        set_frequency(&mut b, 0, freq);
        a.write_register(0x04, 0x20);
        b.write_register(0x04, 0x20);

        // Unrelated writes on b only
        set_frequency(&mut b, 1, 0x4321);
        b.write_register(0x0B, 0x41);
        b.write_register(0x17, 0xF7);
        b.write_register(0x18, 0x5F);

        assert_eq!(accumulator_trace(&mut a, 2000), accumulator_trace(&mut b, 2000), "freq {freq:#06x}");
    }
}

#[test]
fn accumulator_wraps_at_expected_period() {
    let mut sid = pal(ChipModel::Mos8580);
    // 5719 * 0x2000 per sample: one wrap every 2^32 / 46_850_048 samples
    set_frequency(&mut sid, 0, 0x2000);
    let trace = accumulator_trace(&mut sid, 1000);
    let wraps = trace.windows(2).filter(|w| w[1] < w[0]).count();
    let expected = 1000.0 * 46_850_048.0 / 4_294_967_296.0;
    assert!((wraps as f64 - expected).abs() <= 1.0, "{wraps} wraps, expected ~{expected:.1}");
}

#[test]
fn noise_register_never_locks_up() {
    let frequencies = [0xFFFF, 0xFFFE, 0x8001, 0x7FFF, 0x4000, 0x1000, 0x0F0F, 0x0101, 0x0001];
    for (n, &freq) in frequencies.iter().enumerate() {
        let mut sid = pal(ChipModel::Mos6581);
        set_frequency(&mut sid, 0, freq);
        // Voice 3 syncs voice 1 at an unrelated rate
        set_frequency(&mut sid, 2, frequencies[(n + 3) % frequencies.len()]);
        sid.write_register(0x04, 0x83);
        sid.write_register(0x06, 0xF0);

        let mut zero_run = 0;
        let mut longest = 0;
        for i in 0..20_000 {
            if i % 5000 == 4999 {
                // Test bit pulse reseeds the register
                sid.write_register(0x04, 0x8B);
                sid.compute_sample().unwrap();
                sid.write_register(0x04, 0x83);
            }
            sid.compute_sample().unwrap();
            let voice = sid.voice(0).unwrap();
            assert_ne!(voice.noise().register(), 0, "freq {freq:#06x} sample {i}");
            if voice.oscillator() == 0 {
                zero_run += 1;
                longest = longest.max(zero_run);
            } else {
                zero_run = 0;
            }
        }
        if freq >= 0x1000 {
            assert!(longest < 256, "freq {freq:#06x}: {longest} zero samples in a row");
        }
    }
}

#[test]
fn gate_pulse_goes_from_attack_straight_to_release() {
    let mut sid = pal(ChipModel::Mos6581);
    set_frequency(&mut sid, 0, 0x1D25);
    sid.write_register(0x05, 0x88);
    sid.write_register(0x06, 0x88);
    sid.write_register(0x04, 0x21);

    sid.compute_sample().unwrap();
    assert_eq!(sid.envelope_phase(0), EnvelopePhase::Attack);

    sid.write_register(0x04, 0x20);
    let mut phases = Vec::new();
    for _ in 0..50_000 {
        sid.compute_sample().unwrap();
        phases.push(sid.envelope_phase(0));
    }
    assert_eq!(phases[0], EnvelopePhase::Release);
    assert!(!phases.contains(&EnvelopePhase::Decay));
    assert!(!phases.contains(&EnvelopePhase::Sustain));
    assert_eq!(phases.last(), Some(&EnvelopePhase::Idle));
}

#[test]
fn prepare_twice_gives_identical_state() {
    let mut voice = Voice::new();
    voice.write(Register::FreqLo, 0x25);
    voice.write(Register::FreqHi, 0x1D);
    voice.write(Register::PulseWidthHi, 0x06);
    voice.write(Register::Control, 0x55);
    assert!(voice.is_dirty());

    voice.prepare(ChipModel::Mos6581, 5719);
    let first = voice.clone();
    voice.prepare(ChipModel::Mos6581, 5719);
    assert_eq!(voice, first);
    assert!(!voice.is_dirty());

    // Test bit side effects are idempotent too
    voice.write(Register::Control, 0x88);
    voice.prepare(ChipModel::Mos8580, 5719);
    let first = voice.clone();
    voice.prepare(ChipModel::Mos8580, 5719);
    assert_eq!(voice, first);
}

#[test]
fn sawtooth_gate_scenario() {
    let tables = WaveTables::initialize(ChipModel::Mos6581);
    let mut sid = pal(ChipModel::Mos6581);
    set_frequency(&mut sid, 0, 0x1D25);
    sid.write_register(0x05, 0x00); // Attack 0, decay 0
    sid.write_register(0x06, 0xF0); // Sustain 15, release 0
    sid.write_register(0x18, 0x0F);
    sid.write_register(0x04, 0x21); // Sawtooth + gate

    let mut full_at = None;
    for i in 0..1000 {
        sid.compute_sample().unwrap();
        let voice = sid.voice(0).unwrap();
        let phase = (voice.accumulator() >> 20) as usize;
        assert_eq!(voice.oscillator(), tables.sample(Waveform::Sawtooth, phase));
        assert_eq!(sid.voice_output(0), voice.amplitude() * u32::from(voice.oscillator()));
        if full_at.is_none() && voice.amplitude() > 0x7E00 {
            full_at = Some(i);
        }
        if let Some(start) = full_at {
            if i > start {
                assert!(voice.amplitude() > 0x7E00, "sample {i} dropped below full scale");
            }
        }
    }
    assert!(full_at.is_some_and(|i| i < 100), "attack took {full_at:?} samples");
    assert_eq!(sid.envelope_phase(0), EnvelopePhase::Sustain);

    sid.write_register(0x04, 0x20);
    let mut silent_at = None;
    for i in 0..1000 {
        sid.compute_sample().unwrap();
        let voice = sid.voice(0).unwrap();
        let phase = (voice.accumulator() >> 20) as usize;
        assert_eq!(voice.oscillator(), tables.sample(Waveform::Sawtooth, phase));
        if silent_at.is_none() && sid.voice_output(0) == 0 && voice.amplitude() == 0 {
            silent_at = Some(i);
        }
    }
    assert!(silent_at.is_some_and(|i| i < 400), "release took {silent_at:?} samples");
    assert_eq!(sid.envelope_phase(0), EnvelopePhase::Idle);
    assert_eq!(sid.envelope_level(0), 0);
}

#[test]
fn voice3_off_silences_only_unfiltered_voice3() {
    let mut sid = pal(ChipModel::Mos8580);
    set_frequency(&mut sid, 2, 0x1000);
    sid.write_register(0x14, 0xF0);
    sid.write_register(0x12, 0x21);
    sid.write_register(0x18, 0x8F);

    let muted = sid.generate_samples(400).unwrap();
    assert!(muted.windows(2).all(|w| w[0] == w[1]));

    sid.write_register(0x18, 0x0F);
    let audible = sid.generate_samples(400).unwrap();
    assert!(audible.windows(2).any(|w| w[0] != w[1]));
}

/// (source, target) pairs: every voice is driven by the one before it
const NEIGHBOURS: [(u8, u8); 3] = [(2, 0), (0, 1), (1, 2)];

#[test]
fn ring_modulation_follows_previous_voice() {
    for (source, target) in NEIGHBOURS {
        let mut sid = pal(ChipModel::Mos6581);
        set_frequency(&mut sid, source, 0x4000);
        // Target holds phase 0: plain triangle is 0, ring flips it to full scale
        sid.write_register(target * 7 + 4, 0x14);

        let mut flipped = 0;
        for _ in 0..200 {
            sid.compute_sample().unwrap();
            let msb = sid.voice(source.into()).unwrap().accumulator() & 0x8000_0000 != 0;
            let oscillator = sid.voice(target.into()).unwrap().oscillator();
            assert_eq!(oscillator, if msb { 0x7FFF } else { 0 }, "voice {target} from {source}");
            flipped += usize::from(msb);
        }
        assert!(flipped > 50 && flipped < 150, "voice {target}: {flipped} flipped samples");
    }
}

#[test]
fn hard_sync_follows_previous_voice() {
    for (source, target) in NEIGHBOURS {
        let mut sid = pal(ChipModel::Mos8580);
        set_frequency(&mut sid, source, 0xFF00);
        set_frequency(&mut sid, target, 0x0100);
        sid.write_register(target * 7 + 4, 0x02);

        let mut syncs = 0;
        let mut previous = 0;
        for _ in 0..200 {
            sid.compute_sample().unwrap();
            let source_acc = sid.voice(source.into()).unwrap().accumulator();
            let target_acc = sid.voice(target.into()).unwrap().accumulator();
            if source_acc < previous {
                assert_eq!(target_acc, 0, "voice {target} missed sync from {source}");
                syncs += 1;
            } else {
                assert_ne!(target_acc, 0);
            }
            previous = source_acc;
        }
        assert!(syncs > 10, "voice {target}: {syncs} syncs");
    }
}
