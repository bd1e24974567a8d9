//! Wave Table Bank
//!
//! Maps the 12-bit oscillator phase to 15-bit waveform samples. Triangle and
//! sawtooth are exact digital shapes. When more than one waveform bit is
//! selected the real chip does not produce a clean AND of the waveforms:
//! each output bit is pulled down by its neighbours through the shared
//! output transistors. Those combined waveforms are tabulated once per chip
//! revision from a bit pull-down model whose per-revision constants were
//! fitted against sampled hardware output.
//!
//! Pulse is not tabulated (it is a comparison of the phase with the pulse
//! width) and noise comes from the [`super::noise`] generator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::config::ChipModel;

/// Number of phase steps in a table (12-bit phase)
pub const TABLE_SIZE: usize = 4096;

/// Full-scale 15-bit waveform sample
pub const FULL_SCALE: u16 = 0x7FFF;

/// Waveform selected by the control register's upper nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Waveform {
    /// No waveform, or noise mixed with anything else
    #[default]
    Silent,
    /// 0x10
    Triangle,
    /// 0x20
    Sawtooth,
    /// 0x30
    SawTriangle,
    /// 0x40
    Pulse,
    /// 0x50
    PulseTriangle,
    /// 0x60
    PulseSaw,
    /// 0x70
    PulseSawTriangle,
    /// 0x80
    Noise,
}

impl Waveform {
    /// Decode the 4-bit waveform select field
    pub fn from_select(nibble: u8) -> Self {
        match nibble & 0x0F {
            0x1 => Waveform::Triangle,
            0x2 => Waveform::Sawtooth,
            0x3 => Waveform::SawTriangle,
            0x4 => Waveform::Pulse,
            0x5 => Waveform::PulseTriangle,
            0x6 => Waveform::PulseSaw,
            0x7 => Waveform::PulseSawTriangle,
            0x8 => Waveform::Noise,
            _ => Waveform::Silent,
        }
    }

    /// Whether the pulse comparator gates this waveform
    #[inline]
    pub fn has_pulse(self) -> bool {
        matches!(
            self,
            Waveform::Pulse
                | Waveform::PulseTriangle
                | Waveform::PulseSaw
                | Waveform::PulseSawTriangle
        )
    }

    /// Whether ring modulation can invert this waveform on the given model
    ///
    /// The pulse+saw+triangle combination only follows the ring source on the 6581.
    #[inline]
    pub fn ring_modulates(self, model: ChipModel) -> bool {
        match self {
            Waveform::Triangle | Waveform::SawTriangle | Waveform::PulseTriangle => true,
            Waveform::PulseSawTriangle => model == ChipModel::Mos6581,
            _ => false,
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Waveform::Silent => write!(f, "-"),
            Waveform::Triangle => write!(f, "TRI"),
            Waveform::Sawtooth => write!(f, "SAW"),
            Waveform::SawTriangle => write!(f, "SAW+TRI"),
            Waveform::Pulse => write!(f, "PUL"),
            Waveform::PulseTriangle => write!(f, "PUL+TRI"),
            Waveform::PulseSaw => write!(f, "PUL+SAW"),
            Waveform::PulseSawTriangle => write!(f, "PUL+SAW+TRI"),
            Waveform::Noise => write!(f, "NOISE"),
        }
    }
}

/// Pull-down model constants for one combined waveform
#[derive(Debug, Clone, Copy)]
struct CombinedWaveformConfig {
    /// Level above which an output bit survives
    threshold: f32,
    /// Pull of the pulse output on the other bits
    pulse_strength: f32,
    /// Falloff of the influence of higher bits
    distance_above: f32,
    /// Falloff of the influence of lower bits
    distance_below: f32,
}

const fn combined(
    threshold: f32,
    pulse_strength: f32,
    distance_above: f32,
    distance_below: f32,
) -> CombinedWaveformConfig {
    CombinedWaveformConfig {
        threshold,
        pulse_strength,
        distance_above,
        distance_below,
    }
}

/// Per model: saw+tri, pulse+tri, pulse+saw, pulse+saw+tri
const COMBINED_CONFIG: [[CombinedWaveformConfig; 4]; 2] = [
    // 6581
    [
        combined(0.862_147_2, 0.0, 10.896_243, 2.508_481),
        combined(0.932_746_7, 2.075_084, 1.036_682_3, 1.148_77),
        combined(0.860_927_05, 2.435_065_7, 0.908_603_6, 1.079_075_9),
        combined(0.741_343_1, 0.045_255_437, 1.143_960_6, 1.051_399_5),
    ],
    // 8580
    [
        combined(0.715_788_8, 0.0, 1.329_999_4, 2.217_27),
        combined(0.935_003_3, 1.059_771_8, 1.086_294_3, 1.435_185_4),
        combined(0.920_648_6, 0.943_601_07, 1.130_346_5, 1.418_811_1),
        combined(0.909_211, 0.979_807_8, 0.942_194_5, 1.409_588_9),
    ],
];

/// Compute the 12-bit combined output for one phase
///
/// `select` is the waveform nibble (3, 5, 6 or 7).
fn combined_waveform(config: &CombinedWaveformConfig, select: u8, phase: usize) -> u16 {
    let mut bits = [0f32; 12];
    for (i, bit) in bits.iter_mut().enumerate() {
        if phase & (1 << i) != 0 {
            *bit = 1.0;
        }
    }

    // Triangle without saw: bits shift up one and fold on the MSB
    if select & 0x03 == 0x01 {
        let top = phase & 0x800 != 0;
        for i in (1..12).rev() {
            bits[i] = if top { 1.0 - bits[i - 1] } else { bits[i - 1] };
        }
        bits[0] = 0.0;
    } else if select & 0x03 == 0x03 {
        // Saw and unfolded triangle: each saw bit is ANDed with the bit below
        for i in (1..12).rev() {
            bits[i] *= bits[i - 1];
        }
        bits[0] = 0.0;
    }

    // Weight of a bit `d` positions away; index 12 is the bit itself
    let mut distance = [0f32; 25];
    distance[12] = 1.0;
    for d in 1..=12 {
        distance[12 - d] = 1.0 / config.distance_above.powi(d as i32);
        distance[12 + d] = 1.0 / config.distance_below.powi(d as i32);
    }

    let mut value = 0u16;
    for i in 0..12 {
        let mut sum = 0f32;
        let mut weight_sum = 0f32;
        for (j, bit) in bits.iter().enumerate() {
            let weight = distance[i + 12 - j];
            sum += bit * weight;
            weight_sum += weight;
        }
        // Pulse behaves like a thirteenth bit above the MSB
        if select > 4 {
            let weight = distance[i];
            sum += config.pulse_strength * weight;
            weight_sum += weight;
        }
        let level = (bits[i] + sum / weight_sum) * 0.5;
        if level > config.threshold {
            value |= 1 << i;
        }
    }
    value
}

/// Immutable waveform lookup tables for one chip revision
pub struct WaveTables {
    model: ChipModel,
    triangle: Box<[u16]>,
    sawtooth: Box<[u16]>,
    /// saw+tri, pulse+tri, pulse+saw, pulse+saw+tri
    combined: [Box<[u16]>; 4],
}

static BANKS: [OnceLock<Arc<WaveTables>>; 2] = [OnceLock::new(), OnceLock::new()];

impl WaveTables {
    /// Shared tables for a chip revision
    ///
    /// Tables are built on the first request per model and shared by every
    /// engine in the process afterwards; repeated calls are cheap.
    pub fn initialize(model: ChipModel) -> Arc<WaveTables> {
        Arc::clone(BANKS[model.index()].get_or_init(|| {
            log::debug!("building {model} wave tables");
            Arc::new(WaveTables::new(model))
        }))
    }

    /// Build a private set of tables
    pub fn new(model: ChipModel) -> Self {
        let triangle = (0..TABLE_SIZE)
            .map(|i| {
                if i < TABLE_SIZE / 2 {
                    (i << 4) as u16
                } else {
                    (0xFFFF - (i << 4)) as u16
                }
            })
            .collect();
        let sawtooth = (0..TABLE_SIZE).map(|i| (i << 3) as u16).collect();

        let configs = &COMBINED_CONFIG[model.index()];
        let combined = [
            Self::combined_table(&configs[0], 0x3),
            Self::combined_table(&configs[1], 0x5),
            Self::combined_table(&configs[2], 0x6),
            Self::combined_table(&configs[3], 0x7),
        ];

        Self {
            model,
            triangle,
            sawtooth,
            combined,
        }
    }

    fn combined_table(config: &CombinedWaveformConfig, select: u8) -> Box<[u16]> {
        (0..TABLE_SIZE)
            .map(|phase| (combined_waveform(config, select, phase) >> 4) << 7)
            .collect()
    }

    /// Chip revision these tables model
    pub fn model(&self) -> ChipModel {
        self.model
    }

    /// 15-bit sample of a tabulated waveform at a 12-bit phase
    ///
    /// Pulse gating is not applied here: for the pulse combinations this is
    /// the value while the pulse output is high. `Pulse` returns full scale;
    /// `Silent` and `Noise` return 0.
    #[inline]
    pub fn sample(&self, waveform: Waveform, phase: usize) -> u16 {
        let phase = phase & (TABLE_SIZE - 1);
        match waveform {
            Waveform::Triangle => self.triangle[phase],
            Waveform::Sawtooth => self.sawtooth[phase],
            Waveform::SawTriangle => self.combined[0][phase],
            Waveform::Pulse => FULL_SCALE,
            Waveform::PulseTriangle => self.combined[1][phase],
            Waveform::PulseSaw => self.combined[2][phase],
            Waveform::PulseSawTriangle => self.combined[3][phase],
            Waveform::Silent | Waveform::Noise => 0,
        }
    }
}

impl fmt::Debug for WaveTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveTables")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_shape() {
        let tables = WaveTables::new(ChipModel::Mos6581);
        assert_eq!(tables.sample(Waveform::Triangle, 0), 0);
        assert_eq!(tables.sample(Waveform::Triangle, 2047), 0x7FF0);
        assert_eq!(tables.sample(Waveform::Triangle, 2048), 0x7FFF);
        assert_eq!(tables.sample(Waveform::Triangle, 4095), 0x000F);
    }

    #[test]
    fn test_sawtooth_shape() {
        let tables = WaveTables::new(ChipModel::Mos8580);
        for phase in [0, 1, 100, 2048, 4095] {
            assert_eq!(tables.sample(Waveform::Sawtooth, phase), (phase << 3) as u16);
        }
    }

    #[test]
    fn test_combined_tables_start_silent() {
        for model in [ChipModel::Mos6581, ChipModel::Mos8580] {
            let tables = WaveTables::new(model);
            for waveform in [
                Waveform::SawTriangle,
                Waveform::PulseTriangle,
                Waveform::PulseSaw,
                Waveform::PulseSawTriangle,
            ] {
                assert_eq!(tables.sample(waveform, 0), 0, "{model} {waveform}");
            }
        }
    }

    #[test]
    fn test_saw_triangle_peaks_at_end_of_cycle() {
        for model in [ChipModel::Mos6581, ChipModel::Mos8580] {
            let tables = WaveTables::new(model);
            assert_eq!(tables.sample(Waveform::SawTriangle, 4095), 0x7F80);
        }
    }

    /// Digital AND of the selected waveforms as a 12-bit value
    fn digital_and(select: u8, phase: usize) -> usize {
        let triangle = if select & 0x02 != 0 {
            // Saw selected: the triangle does not fold
            (phase << 1) & 0xFFF
        } else if phase & 0x800 != 0 {
            !(phase << 1) & 0xFFE
        } else {
            (phase << 1) & 0xFFE
        };
        let mut value = 0xFFF;
        if select & 0x01 != 0 {
            value &= triangle;
        }
        if select & 0x02 != 0 {
            value &= phase;
        }
        value
    }

    #[test]
    fn test_combined_bits_never_exceed_digital_and() {
        for model in [ChipModel::Mos6581, ChipModel::Mos8580] {
            let tables = WaveTables::new(model);
            for (waveform, select) in [
                (Waveform::SawTriangle, 0x3),
                (Waveform::PulseTriangle, 0x5),
                (Waveform::PulseSaw, 0x6),
                (Waveform::PulseSawTriangle, 0x7),
            ] {
                for phase in 0..TABLE_SIZE {
                    let bits = usize::from(tables.sample(waveform, phase) >> 7);
                    let allowed = digital_and(select, phase) >> 4;
                    assert_eq!(bits & !allowed, 0, "{model} {waveform} phase {phase}");
                }
            }
        }
    }

    #[test]
    fn test_combined_table_values() {
        let old = WaveTables::new(ChipModel::Mos6581);
        let cases: [(Waveform, [(usize, u16); 5]); 4] = [
            (
                Waveform::SawTriangle,
                [(796, 0x0080), (1402, 0x0300), (2166, 0x0200), (3531, 0x0800), (3957, 0x6200)],
            ),
            (
                Waveform::PulseTriangle,
                [(1977, 0x7800), (2042, 0x7F80), (2311, 0x4000), (2344, 0x4000), (2577, 0x4000)],
            ),
            (
                Waveform::PulseSaw,
                [(251, 0x0780), (974, 0x1E00), (1493, 0x2E80), (2799, 0x5700), (3892, 0x7980)],
            ),
            (
                Waveform::PulseSawTriangle,
                [(927, 0x0080), (1022, 0x1F80), (1982, 0x3980), (3519, 0x4980), (3902, 0x7180)],
            ),
        ];
        for (waveform, spots) in cases {
            for (phase, expected) in spots {
                assert_eq!(old.sample(waveform, phase), expected, "6581 {waveform} {phase}");
            }
        }

        let new = WaveTables::new(ChipModel::Mos8580);
        let cases: [(Waveform, [(usize, u16); 5]); 4] = [
            (
                Waveform::SawTriangle,
                [(1885, 0x3000), (2043, 0x3F80), (2932, 0x0300), (3048, 0x1E00), (3178, 0x4000)],
            ),
            (
                Waveform::PulseTriangle,
                [(1788, 0x4000), (1899, 0x4000), (1982, 0x7800), (2012, 0x7800), (2210, 0x4000)],
            ),
            (
                Waveform::PulseSaw,
                [(3931, 0x7000), (3977, 0x6000), (4008, 0x7000), (4039, 0x7800), (4046, 0x7C00)],
            ),
            (
                Waveform::PulseSawTriangle,
                [(4028, 0x7000), (4036, 0x7000), (4043, 0x7000), (4057, 0x7800), (4095, 0x7F80)],
            ),
        ];
        for (waveform, spots) in cases {
            for (phase, expected) in spots {
                assert_eq!(new.sample(waveform, phase), expected, "8580 {waveform} {phase}");
            }
        }
    }

    #[test]
    fn test_saw_triangle_needs_adjacent_bits() {
        // 0x555: no two neighbouring phase bits set, so saw AND triangle is empty
        for model in [ChipModel::Mos6581, ChipModel::Mos8580] {
            let tables = WaveTables::new(model);
            assert_eq!(tables.sample(Waveform::SawTriangle, 0x555), 0, "{model}");
            assert_eq!(tables.sample(Waveform::SawTriangle, 0xAAA), 0, "{model}");
        }
    }

    #[test]
    fn test_combined_values_are_eight_bit() {
        let tables = WaveTables::new(ChipModel::Mos6581);
        for phase in 0..TABLE_SIZE {
            let value = tables.sample(Waveform::PulseSaw, phase);
            assert_eq!(value & 0x7F, 0);
            assert!(value <= 0x7F80);
        }
    }

    #[test]
    fn test_models_differ() {
        let old = WaveTables::new(ChipModel::Mos6581);
        let new = WaveTables::new(ChipModel::Mos8580);
        let differs = (0..TABLE_SIZE)
            .any(|p| old.sample(Waveform::SawTriangle, p) != new.sample(Waveform::SawTriangle, p));
        assert!(differs);
    }

    #[test]
    fn test_initialize_is_shared() {
        let a = WaveTables::initialize(ChipModel::Mos8580);
        let b = WaveTables::initialize(ChipModel::Mos8580);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.model(), ChipModel::Mos8580);
    }

    #[test]
    fn test_waveform_decoding() {
        assert_eq!(Waveform::from_select(0x0), Waveform::Silent);
        assert_eq!(Waveform::from_select(0x7), Waveform::PulseSawTriangle);
        assert_eq!(Waveform::from_select(0x8), Waveform::Noise);
        assert_eq!(Waveform::from_select(0x9), Waveform::Silent);
        assert!(Waveform::PulseSaw.has_pulse());
        assert!(!Waveform::PulseSawTriangle.ring_modulates(ChipModel::Mos8580));
        assert!(Waveform::PulseSawTriangle.ring_modulates(ChipModel::Mos6581));
    }
}
