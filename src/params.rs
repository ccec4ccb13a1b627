//! The sound parameter set and its serialized forms.
//!
//! A [`Parameters`] value fully determines a sound's timbre. It is 32
//! floats wide (27 in use, 5 reserved) so the binary block stays at a
//! fixed 128-byte payload.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::error::{ConfigError, LoadError};

/// Number of named parameters.
pub const PARAM_COUNT: usize = 27;
/// Number of float slots including the reserved tail.
pub const SLOT_COUNT: usize = 32;

/// Canonical, case-sensitive parameter names in slot order.
pub const PARAM_NAMES: [&str; PARAM_COUNT] = [
    "WAVE TYPE",
    "ATTACK TIME",
    "SUSTAIN TIME",
    "SUSTAIN PUNCH",
    "DECAY TIME",
    "START FREQUENCY",
    "MIN FREQUENCY",
    "SLIDE",
    "DELTA SLIDE",
    "VIBRATO DEPTH",
    "VIBRATO SPEED",
    "VIBRATO DELAY",
    "CHANGE AMOUNT",
    "CHANGE SPEED",
    "SQUARE DUTY",
    "DUTY SWEEP",
    "REPEAT SPEED",
    "PHASER OFFSET",
    "PHASER SWEEP",
    "FILTER ON",
    "LP FILTER CUTOFF",
    "LP FILTER CUTOFF SWEEP",
    "LP FILTER RESONANCE",
    "HP FILTER CUTOFF",
    "HP FILTER CUTOFF SWEEP",
    "DECIMATE",
    "COMPRESS",
];

const WAVE_TYPE_SLOT: usize = 0;
const DECIMATE_SLOT: usize = 25;

/// Word-mode scale for normalized fields. Covers ±2.048, which holds every
/// value `randomize` produces, with a rounding error of at most 1/32000.
const WORD_SCALE: f32 = 16000.0;
/// Word-mode scale for the whole-number-range fields (wave type, decimate).
const WIDE_WORD_SCALE: f32 = 1000.0;

/// The sound description: envelope, pitch, modulation, filters, effects.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameters {
    pub wave_type: f32,
    pub env_attack: f32,
    pub env_sustain: f32,
    pub env_punch: f32,
    pub env_decay: f32,
    pub base_freq: f32,
    pub freq_limit: f32,
    pub freq_ramp: f32,
    pub freq_dramp: f32,
    pub vib_strength: f32,
    pub vib_speed: f32,
    pub vib_delay: f32,
    pub arp_mod: f32,
    pub arp_speed: f32,
    pub duty: f32,
    pub duty_ramp: f32,
    pub repeat_speed: f32,
    pub pha_offset: f32,
    pub pha_ramp: f32,
    pub filter_on: f32,
    pub lpf_freq: f32,
    pub lpf_ramp: f32,
    pub lpf_resonance: f32,
    pub hpf_freq: f32,
    pub hpf_ramp: f32,
    pub decimate: f32,
    pub compress: f32,
    #[serde(default)]
    pub reserved: [f32; SLOT_COUNT - PARAM_COUNT],
}

impl Parameters {
    /// The documented defaults: a plain square blip.
    pub fn new() -> Self {
        Parameters {
            base_freq: 0.3,
            env_sustain: 0.3,
            env_decay: 0.4,
            lpf_freq: 1.0,
            ..Default::default()
        }
    }

    /// Selected waveform, or `None` for an out-of-range wave type.
    pub fn waveform(&self) -> Option<Waveform> {
        Waveform::from_param(self.wave_type)
    }

    /// Slot index of a canonical parameter name.
    pub fn index_of(name: &str) -> Result<usize, ConfigError> {
        PARAM_NAMES
            .iter()
            .position(|&n| n == name)
            .ok_or_else(|| ConfigError::UnknownParameter(name.to_string()))
    }

    /// Read a slot (0..32, reserved slots included).
    pub fn slot(&self, index: usize) -> Result<f32, ConfigError> {
        let mut copy = *self;
        copy.slot_mut(index).map(|v| *v)
    }

    /// Mutable access to a slot (0..32, reserved slots included).
    pub fn slot_mut(&mut self, index: usize) -> Result<&mut f32, ConfigError> {
        let p = self;
        Ok(match index {
            0 => &mut p.wave_type,
            1 => &mut p.env_attack,
            2 => &mut p.env_sustain,
            3 => &mut p.env_punch,
            4 => &mut p.env_decay,
            5 => &mut p.base_freq,
            6 => &mut p.freq_limit,
            7 => &mut p.freq_ramp,
            8 => &mut p.freq_dramp,
            9 => &mut p.vib_strength,
            10 => &mut p.vib_speed,
            11 => &mut p.vib_delay,
            12 => &mut p.arp_mod,
            13 => &mut p.arp_speed,
            14 => &mut p.duty,
            15 => &mut p.duty_ramp,
            16 => &mut p.repeat_speed,
            17 => &mut p.pha_offset,
            18 => &mut p.pha_ramp,
            19 => &mut p.filter_on,
            20 => &mut p.lpf_freq,
            21 => &mut p.lpf_ramp,
            22 => &mut p.lpf_resonance,
            23 => &mut p.hpf_freq,
            24 => &mut p.hpf_ramp,
            25 => &mut p.decimate,
            26 => &mut p.compress,
            i @ PARAM_COUNT..SLOT_COUNT => &mut p.reserved[i - PARAM_COUNT],
            i => return Err(ConfigError::ParameterIndexOutOfRange(i)),
        })
    }

    /// Read a parameter by canonical name.
    pub fn get(&self, name: &str) -> Result<f32, ConfigError> {
        self.slot(Self::index_of(name)?)
    }

    /// Write a parameter by canonical name.
    pub fn set(&mut self, name: &str, value: f32) -> Result<(), ConfigError> {
        *self.slot_mut(Self::index_of(name)?)? = value;
        Ok(())
    }

    /// All 32 slots in block order.
    pub fn to_slots(&self) -> [f32; SLOT_COUNT] {
        let mut copy = *self;
        let mut slots = [0.0; SLOT_COUNT];
        for (i, s) in slots.iter_mut().enumerate() {
            if let Ok(v) = copy.slot_mut(i) {
                *s = *v;
            }
        }
        slots
    }

    pub fn from_slots(slots: &[f32; SLOT_COUNT]) -> Self {
        let mut p = Parameters::default();
        for (i, &v) in slots.iter().enumerate() {
            if let Ok(s) = p.slot_mut(i) {
                *s = v;
            }
        }
        p
    }

    /// 16-bit fixed-point form of every slot.
    pub fn to_words(&self) -> [i16; SLOT_COUNT] {
        let slots = self.to_slots();
        let mut words = [0i16; SLOT_COUNT];
        for (i, w) in words.iter_mut().enumerate() {
            *w = quantize(slots[i], word_scale(i));
        }
        words
    }

    pub fn from_words(words: &[i16; SLOT_COUNT]) -> Self {
        let mut slots = [0.0; SLOT_COUNT];
        for (i, s) in slots.iter_mut().enumerate() {
            *s = words[i] as f32 / word_scale(i);
        }
        Self::from_slots(&slots)
    }

    /// Snap every slot to the value its word-mode encoding reloads as.
    pub fn lock_to_words(&mut self) {
        *self = Self::from_words(&self.to_words());
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn word_scale(slot: usize) -> f32 {
    match slot {
        WAVE_TYPE_SLOT | DECIMATE_SLOT => WIDE_WORD_SCALE,
        _ => WORD_SCALE,
    }
}

fn quantize(value: f32, scale: f32) -> i16 {
    (value * scale).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

// ── Binary parameter block ─────────────────────────────────

/// Layout of the binary parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFormat {
    /// `f32` version, 32 × `f32` slots, `f32` sound volume.
    Plain,
    /// `i16` version, 32 × `i16` fixed-point slots, `i16` sound volume.
    Word,
}

const PLAIN_VERSION: f32 = 1.0;
const WORD_VERSION: i16 = 100;

impl BlockFormat {
    /// Encoded size in bytes.
    pub fn encoded_len(self) -> usize {
        match self {
            BlockFormat::Plain => 4 * (SLOT_COUNT + 2),
            BlockFormat::Word => 2 * (SLOT_COUNT + 2),
        }
    }
}

/// Parameters plus the per-sound volume, as saved and loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterBlock {
    pub params: Parameters,
    pub sound_volume: f32,
}

impl ParameterBlock {
    /// Snap parameters and volume to what a word-mode block reloads as.
    pub fn lock_to_words(&mut self) {
        self.params.lock_to_words();
        self.sound_volume = quantize(self.sound_volume, WORD_SCALE) as f32 / WORD_SCALE;
    }

    /// Write the block, little-endian, led by its version tag.
    pub fn write_to<W: Write>(&self, format: BlockFormat, sink: &mut W) -> std::io::Result<()> {
        let mut out = Vec::with_capacity(format.encoded_len());
        match format {
            BlockFormat::Plain => {
                out.extend_from_slice(&PLAIN_VERSION.to_le_bytes());
                for v in self.params.to_slots() {
                    out.extend_from_slice(&v.to_le_bytes());
                }
                out.extend_from_slice(&self.sound_volume.to_le_bytes());
            }
            BlockFormat::Word => {
                out.extend_from_slice(&WORD_VERSION.to_le_bytes());
                for w in self.params.to_words() {
                    out.extend_from_slice(&w.to_le_bytes());
                }
                out.extend_from_slice(&quantize(self.sound_volume, WORD_SCALE).to_le_bytes());
            }
        }
        sink.write_all(&out)
    }

    /// Read and validate a block. Nothing is returned unless the whole
    /// block is present and its version tag is accepted.
    pub fn read_from<R: Read>(format: BlockFormat, source: &mut R) -> Result<Self, LoadError> {
        let expected = format.encoded_len();
        let mut raw = Vec::with_capacity(expected);
        source.take(expected as u64).read_to_end(&mut raw)?;
        if raw.len() < expected {
            return Err(LoadError::Truncated {
                expected,
                found: raw.len(),
            });
        }

        match format {
            BlockFormat::Plain => {
                let mut values = raw
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]));
                let version = values.next().unwrap_or_default();
                if !(1.0..2.0).contains(&version) {
                    return Err(LoadError::UnsupportedVersion(version));
                }
                let mut slots = [0.0; SLOT_COUNT];
                for s in slots.iter_mut() {
                    *s = values.next().unwrap_or_default();
                }
                Ok(ParameterBlock {
                    params: Parameters::from_slots(&slots),
                    sound_volume: values.next().unwrap_or_default(),
                })
            }
            BlockFormat::Word => {
                let mut values = raw.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]]));
                let version = values.next().unwrap_or_default();
                if !(100..199).contains(&version) {
                    return Err(LoadError::UnsupportedWordVersion(version));
                }
                let mut words = [0i16; SLOT_COUNT];
                for w in words.iter_mut() {
                    *w = values.next().unwrap_or_default();
                }
                Ok(ParameterBlock {
                    params: Parameters::from_words(&words),
                    sound_volume: values.next().unwrap_or_default() as f32 / WORD_SCALE,
                })
            }
        }
    }
}
