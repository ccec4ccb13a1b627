//! The sound object: parameter lifecycle, synthesis and export.
//!
//! A [`Sound`] holds the authoritative parameter set and the last rendered
//! buffer. Anything that changes what synthesis would produce marks it
//! dirty, and every export or query re-renders first when needed.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::config::{self, RenderConfig, RenderMode};
use crate::dsp::buffer::SampleBuffer;
use crate::dsp::engine::{BASE_SAMPLE_RATE, SynthEngine};
use crate::dsp::renderer::{self, ExportFormat};
use crate::error::{ConfigError, LoadError, SfxrError};
use crate::params::{ParameterBlock, Parameters};
use crate::preset::{self, SoundKind};

/// Per-sound volume applied on top of the master gain.
pub const DEFAULT_SOUND_VOLUME: f32 = 0.5;

const SEED_STATE_MIX: u64 = 0x6350_5020_5366_7872;
const SEED_STREAM_MASK: u64 = 0x6D75_7261_6761_6D69;
const EMPTY_STREAM_KEY: u64 = 0xBABA_BABA;

/// Preset/randomization generator for a numeric seed.
pub fn seeded_rng(seed: u64) -> Pcg32 {
    Pcg32::new(SEED_STATE_MIX ^ seed, SEED_STREAM_MASK & seed)
}

/// Preset/randomization generator for a text seed of at least 4 bytes.
///
/// The first four bytes select the state, the next four the stream.
pub fn seeded_rng_from_str(seed: &str) -> Result<Pcg32, ConfigError> {
    let bytes = seed.as_bytes();
    if bytes.len() < 4 {
        return Err(ConfigError::SeedTooShort(bytes.len()));
    }
    let state = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64;
    let mut stream = bytes[4..bytes.len().min(8)]
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (b as u64) << (8 * i));
    if stream == 0 {
        stream = EMPTY_STREAM_KEY;
    }
    Ok(Pcg32::new(SEED_STATE_MIX ^ state, SEED_STREAM_MASK & stream))
}

/// Full statistics about the rendered buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundInfo {
    /// Length in seconds at the configured output rate.
    pub duration: f32,
    pub total_samples: usize,
    /// Size of the samples as 32-bit floats.
    pub total_bytes: usize,
    /// Bytes held by the block storage.
    pub memory_used: usize,
    /// `memory_used / total_bytes`, 0 for an empty sound.
    pub overhead: f32,
    /// Largest absolute sample.
    pub peak: f32,
    /// Mean absolute sample.
    pub mean: f32,
    /// Raw PCM format for the configured bit depth.
    pub format: ExportFormat,
}

/// The cheap subset of [`SoundInfo`]: no buffer scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundQuickInfo {
    pub duration: f32,
    pub total_samples: usize,
    pub total_bytes: usize,
    pub format: ExportFormat,
}

/// One procedurally generated sound effect.
#[derive(Debug, Clone)]
pub struct Sound {
    params: Parameters,
    sound_volume: f32,
    config: RenderConfig,
    rng: Pcg32,
    buffer: SampleBuffer,
    rendered: bool,
    dirty: bool,
    user_data: Vec<u8>,
}

impl Sound {
    /// A sound with default parameters. Nothing is rendered until needed.
    pub fn new(config: RenderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        warn_experimental_rate(config.sample_rate);
        Ok(Sound {
            params: Parameters::new(),
            sound_volume: DEFAULT_SOUND_VOLUME,
            config,
            rng: seeded_rng(0),
            buffer: SampleBuffer::new(),
            rendered: false,
            dirty: true,
            user_data: Vec::new(),
        })
    }

    // ── Configuration ──────────────────────────────────────

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replace the whole configuration.
    pub fn set_config(&mut self, config: RenderConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config.sample_rate != self.config.sample_rate {
            warn_experimental_rate(config.sample_rate);
        }
        self.config = config;
        self.dirty = true;
        Ok(())
    }

    /// Change output rate and PCM depth. Only a rate change forces a
    /// re-render; the depth is applied at export.
    pub fn set_pcm(&mut self, sample_rate: u32, bit_depth: u32) -> Result<(), ConfigError> {
        config::validate_sample_rate(sample_rate)?;
        config::validate_bit_depth(bit_depth)?;
        if sample_rate != self.config.sample_rate {
            warn_experimental_rate(sample_rate);
            self.config.sample_rate = sample_rate;
            self.dirty = true;
        }
        self.config.bit_depth = bit_depth;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.config.mode = mode;
        self.dirty = true;
    }

    pub fn set_noise_seed(&mut self, seed: u64) {
        self.config.noise_seed = seed;
        self.dirty = true;
    }

    /// Reseed the preset/randomization generator.
    pub fn seed(&mut self, seed: u64) {
        self.rng = seeded_rng(seed);
    }

    pub fn seed_str(&mut self, seed: &str) -> Result<(), ConfigError> {
        self.rng = seeded_rng_from_str(seed)?;
        Ok(())
    }

    // ── Parameters ─────────────────────────────────────────

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn set_params(&mut self, params: Parameters) {
        self.params = params;
        self.dirty = true;
    }

    pub fn get(&self, name: &str) -> Result<f32, ConfigError> {
        self.params.get(name)
    }

    pub fn set(&mut self, name: &str, value: f32) -> Result<(), ConfigError> {
        self.params.set(name, value)?;
        self.dirty = true;
        Ok(())
    }

    pub fn get_index(&self, index: usize) -> Result<f32, ConfigError> {
        self.params.slot(index)
    }

    pub fn set_index(&mut self, index: usize, value: f32) -> Result<(), ConfigError> {
        *self.params.slot_mut(index)? = value;
        self.dirty = true;
        Ok(())
    }

    pub fn sound_volume(&self) -> f32 {
        self.sound_volume
    }

    pub fn set_sound_volume(&mut self, volume: f32) {
        self.sound_volume = volume;
        self.dirty = true;
    }

    /// Restore the default parameters.
    pub fn reset(&mut self) {
        self.set_params(Parameters::new());
    }

    pub fn randomize(&mut self) {
        preset::randomize(&mut self.params, &mut self.rng);
        self.dirty = true;
    }

    pub fn mutate(&mut self, amount: f32) {
        preset::mutate(&mut self.params, &mut self.rng, amount);
        self.dirty = true;
    }

    /// Generate a preset and render it. Returns the sample count.
    pub fn create_preset(&mut self, kind: SoundKind) -> usize {
        kind.apply(&mut self.params, &mut self.rng);
        self.create()
    }

    /// [`create_preset`](Self::create_preset) by display name.
    pub fn create_named(&mut self, name: &str) -> Result<usize, ConfigError> {
        Ok(self.create_preset(SoundKind::from_name(name)?))
    }

    // ── Synthesis ──────────────────────────────────────────

    /// Render the current parameters now. Returns the sample count.
    pub fn create(&mut self) -> usize {
        if self.config.mode.word_params {
            let mut block = self.block();
            block.lock_to_words();
            self.params = block.params;
            self.sound_volume = block.sound_volume;
        }

        self.buffer.clear();
        let mut engine = SynthEngine::new(
            self.params,
            self.sound_volume,
            self.config.sample_rate,
            self.config.noise_seed,
        );
        let produced = engine.render(&mut self.buffer);
        if self.config.mode.normalize {
            self.normalize();
        }

        self.rendered = true;
        self.dirty = false;
        produced
    }

    /// Render if never rendered or changed since the last render.
    pub fn ensure_rendered(&mut self) {
        if !self.rendered || self.dirty {
            self.create();
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.rendered || self.dirty
    }

    /// Scale the rendered buffer so its peak is 1.0. Silent buffers are
    /// left alone.
    pub fn normalize(&mut self) {
        let (peak, _) = self.buffer.peak_and_mean();
        if peak > 0.0 {
            self.buffer.scale(1.0 / peak);
        }
    }

    /// The rendered samples, rendering first if needed.
    pub fn samples(&mut self) -> impl Iterator<Item = f32> + '_ {
        self.ensure_rendered();
        self.buffer.iter()
    }

    /// The buffer as last rendered, without re-rendering.
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn info(&mut self) -> SoundInfo {
        self.ensure_rendered();
        let quick = self.quick_info();
        let memory_used = self.buffer.memory_bytes();
        let (peak, mean) = self.buffer.peak_and_mean();
        SoundInfo {
            duration: quick.duration,
            total_samples: quick.total_samples,
            total_bytes: quick.total_bytes,
            memory_used,
            overhead: if quick.total_bytes == 0 {
                0.0
            } else {
                memory_used as f32 / quick.total_bytes as f32
            },
            peak,
            mean,
            format: quick.format,
        }
    }

    pub fn quick_info(&mut self) -> SoundQuickInfo {
        self.ensure_rendered();
        let total_samples = self.buffer.len();
        SoundQuickInfo {
            duration: total_samples as f32 / self.config.sample_rate as f32,
            total_samples,
            total_bytes: self.buffer.size_bytes(),
            format: ExportFormat::pcm(self.config.bit_depth).unwrap_or(ExportFormat::Pcm16),
        }
    }

    // ── Parameter persistence ──────────────────────────────

    fn block(&self) -> ParameterBlock {
        ParameterBlock {
            params: self.params,
            sound_volume: self.sound_volume,
        }
    }

    /// Load a parameter block in the configured layout. On failure the
    /// current parameters are kept.
    pub fn load<R: Read>(&mut self, source: &mut R) -> Result<(), LoadError> {
        let block = ParameterBlock::read_from(self.config.block_format(), source)?;
        self.params = block.params;
        self.sound_volume = block.sound_volume;
        self.dirty = true;
        Ok(())
    }

    /// Save the parameter block in the configured layout.
    pub fn save<W: Write>(&self, sink: &mut W) -> std::io::Result<()> {
        self.block().write_to(self.config.block_format(), sink)
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SfxrError> {
        let mut reader = BufReader::new(File::open(path)?);
        Ok(self.load(&mut reader)?)
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SfxrError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    // ── Export ─────────────────────────────────────────────

    /// Encoded size of an export, rendering first if needed.
    pub fn export_size(&mut self, format: ExportFormat) -> Result<usize, SfxrError> {
        self.ensure_rendered();
        Ok(format.export_size(&self.buffer, self.config.bit_depth)?)
    }

    /// Export in `format`. Raw PCM formats also become the configured
    /// bit depth.
    pub fn export_to<W: Write>(&mut self, format: ExportFormat, sink: &mut W) -> Result<(), SfxrError> {
        self.ensure_rendered();
        if let Some(bits) = format.forced_bit_depth() {
            self.config.bit_depth = bits;
        }
        renderer::export(
            &self.buffer,
            format,
            self.config.sample_rate,
            self.config.bit_depth,
            sink,
        )
    }

    pub fn export_bytes(&mut self, format: ExportFormat) -> Result<Vec<u8>, SfxrError> {
        let mut out = Vec::with_capacity(self.export_size(format)?);
        self.export_to(format, &mut out)?;
        Ok(out)
    }

    pub fn export_file<P: AsRef<Path>>(&mut self, format: ExportFormat, path: P) -> Result<(), SfxrError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.export_to(format, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a PCM WAV file at the configured depth.
    pub fn export_wav_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SfxrError> {
        self.export_file(ExportFormat::WavePcm, path)
    }

    /// Write a 32-bit float WAV file.
    pub fn export_wav_float_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SfxrError> {
        self.export_file(ExportFormat::WaveFloat, path)
    }

    // ── User data ──────────────────────────────────────────

    /// Attach an opaque payload; it never affects synthesis.
    pub fn set_user_data(&mut self, data: Vec<u8>) {
        self.user_data = data;
    }

    pub fn user_data(&self) -> &[u8] {
        &self.user_data
    }
}

impl Default for Sound {
    fn default() -> Self {
        Sound {
            params: Parameters::new(),
            sound_volume: DEFAULT_SOUND_VOLUME,
            config: RenderConfig::default(),
            rng: seeded_rng(0),
            buffer: SampleBuffer::new(),
            rendered: false,
            dirty: true,
            user_data: Vec::new(),
        }
    }
}

fn warn_experimental_rate(sample_rate: u32) {
    if sample_rate != BASE_SAMPLE_RATE {
        log::warn!(
            "Output rate {sample_rate} Hz differs from {BASE_SAMPLE_RATE} Hz; the rendered sound will not match exactly"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::Waveform;
    use crate::params::BlockFormat;
    use std::io::Cursor;

    #[test]
    fn default_sound_renders() {
        let mut sound = Sound::default();
        assert!(sound.is_dirty());
        let info = sound.quick_info();
        assert!(!sound.is_dirty());
        assert!(info.total_samples > 0);
        assert_eq!(info.total_bytes, info.total_samples * 4);
        assert!((info.duration - info.total_samples as f32 / 44100.0).abs() < 1e-6);
        assert_eq!(info.format, ExportFormat::Pcm16);
    }

    #[test]
    fn parameter_change_forces_rerender() {
        let mut sound = Sound::default();
        let before = sound.quick_info().total_samples;
        sound.set("DECAY TIME", 0.1).unwrap();
        assert!(sound.is_dirty());
        let after = sound.quick_info().total_samples;
        assert!(after < before, "Shorter decay should shorten the sound");
    }

    #[test]
    fn name_and_index_access_agree() {
        let mut sound = Sound::default();
        sound.set("SLIDE", 0.25).unwrap();
        assert_eq!(sound.get_index(7).unwrap(), 0.25);
        sound.set_index(5, 0.6).unwrap();
        assert_eq!(sound.get("START FREQUENCY").unwrap(), 0.6);
        assert!(matches!(sound.get("NOPE"), Err(ConfigError::UnknownParameter(_))));
        assert!(matches!(
            sound.set_index(40, 1.0),
            Err(ConfigError::ParameterIndexOutOfRange(40))
        ));
    }

    #[test]
    fn export_size_matches_export() {
        let mut sound = Sound::default();
        for format in [
            ExportFormat::WavePcm,
            ExportFormat::WaveFloat,
            ExportFormat::Pcm8,
            ExportFormat::Pcm16,
            ExportFormat::Pcm24,
            ExportFormat::Pcm32,
            ExportFormat::Float,
        ] {
            let size = sound.export_size(format).unwrap();
            let bytes = sound.export_bytes(format).unwrap();
            assert_eq!(bytes.len(), size, "{format:?}");
        }
    }

    #[test]
    fn raw_pcm_export_sets_bit_depth() {
        let mut sound = Sound::default();
        sound.export_bytes(ExportFormat::Pcm24).unwrap();
        assert_eq!(sound.config().bit_depth, 24);
        let wav = sound.export_bytes(ExportFormat::WavePcm).unwrap();
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 24);
        assert!(!sound.is_dirty(), "Depth changes must not force a re-render");
    }

    #[test]
    fn zero_length_sound_exports_header_only() {
        let mut sound = Sound::default();
        sound.set("SUSTAIN TIME", 0.0).unwrap();
        sound.set("DECAY TIME", 0.0).unwrap();
        assert_eq!(sound.create(), 0);
        assert_eq!(sound.export_bytes(ExportFormat::WavePcm).unwrap().len(), 44);
        assert_eq!(sound.export_bytes(ExportFormat::WaveFloat).unwrap().len(), 46);
        let info = sound.info();
        assert_eq!(info.total_samples, 0);
        assert_eq!(info.overhead, 0.0);
        assert_eq!(info.peak, 0.0);
    }

    #[test]
    fn exported_samples_stay_in_range() {
        let mut sound = Sound::default();
        sound.seed(42);
        for _ in 0..5 {
            sound.randomize();
            sound.set_sound_volume(4.0);
            let wav = sound.export_bytes(ExportFormat::WavePcm).unwrap();
            let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
            for s in reader.samples::<i16>() {
                let s = s.unwrap();
                assert!(s >= -32767, "Sample {s} below the symmetric range");
            }
        }
    }

    #[test]
    fn same_seed_same_sound() {
        let mut a = Sound::default();
        let mut b = Sound::default();
        a.seed_str("coins!").unwrap();
        b.seed_str("coins!").unwrap();
        for kind in SoundKind::ALL {
            a.create_preset(kind);
            b.create_preset(kind);
            assert_eq!(a.params(), b.params(), "{kind}");
            assert!(a.samples().eq(b.samples()), "{kind} audio differs");
        }
    }

    #[test]
    fn short_text_seed_rejected() {
        let mut sound = Sound::default();
        assert!(matches!(sound.seed_str("abc"), Err(ConfigError::SeedTooShort(3))));
        assert!(sound.seed_str("abcd").is_ok());
    }

    #[test]
    fn jump_preset_is_square() {
        let mut sound = Sound::default();
        sound.seed(1234);
        sound.create_named("JUMP").unwrap();
        assert_eq!(sound.params().waveform(), Some(Waveform::Square));
        assert!(matches!(
            sound.create_named("WHOOSH"),
            Err(ConfigError::UnknownSoundKind(_))
        ));
    }

    #[test]
    fn jump_starts_from_silence() {
        for seed in [0, 1234] {
            let mut sound = Sound::default();
            sound.seed(seed);
            sound.create_preset(SoundKind::Jump);
            assert_eq!(sound.params().env_attack, 0.0);
            let mut samples = sound.samples();
            assert_eq!(samples.next(), Some(0.0), "JUMP (seed {seed}) must open silent");
            assert!(samples.any(|s| s != 0.0));
        }
    }

    #[test]
    fn attack_makes_first_sample_silent() {
        let mut sound = Sound::default();
        sound.seed(1234);
        sound.create_preset(SoundKind::Jump);
        sound.set("ATTACK TIME", 0.1).unwrap();
        assert_eq!(sound.samples().next(), Some(0.0));
    }

    #[test]
    fn plain_save_load_round_trip() {
        let mut sound = Sound::default();
        sound.seed(8);
        sound.randomize();
        sound.set_sound_volume(0.42);
        let mut bytes = Vec::new();
        sound.save(&mut bytes).unwrap();
        assert_eq!(bytes.len(), BlockFormat::Plain.encoded_len());

        let mut other = Sound::default();
        other.load(&mut bytes.as_slice()).unwrap();
        assert_eq!(other.params(), sound.params());
        assert_eq!(other.sound_volume(), 0.42);
        assert!(other.samples().eq(sound.samples()));
    }

    #[test]
    fn word_mode_reload_is_bit_identical() {
        let word = RenderMode { word_params: true, normalize: false };
        let mut sound = Sound::default();
        sound.set_mode(word);
        sound.seed(99);
        sound.create_preset(SoundKind::LaserShoot);
        let original = sound.export_bytes(ExportFormat::Float).unwrap();

        let mut bytes = Vec::new();
        sound.save(&mut bytes).unwrap();
        assert_eq!(bytes.len(), BlockFormat::Word.encoded_len());

        let mut reloaded = Sound::default();
        reloaded.set_mode(word);
        reloaded.load(&mut bytes.as_slice()).unwrap();
        assert_eq!(reloaded.params(), sound.params());
        assert_eq!(reloaded.export_bytes(ExportFormat::Float).unwrap(), original);
    }

    #[test]
    fn failed_load_keeps_parameters() {
        let mut sound = Sound::default();
        sound.set("PHASER OFFSET", 0.3).unwrap();
        let before = *sound.params();
        let garbage = [0u8; 20];
        assert!(matches!(
            sound.load(&mut garbage.as_slice()),
            Err(LoadError::Truncated { .. })
        ));
        assert_eq!(*sound.params(), before);
    }

    #[test]
    fn normalize_mode_hits_full_scale() {
        let mut sound = Sound::default();
        sound.set_mode(RenderMode { normalize: true, word_params: false });
        let info = sound.info();
        assert!((info.peak - 1.0).abs() < 1e-6, "Peak was {}", info.peak);
    }

    #[test]
    fn info_reports_memory_overhead() {
        let mut sound = Sound::default();
        let info = sound.info();
        assert!(info.memory_used >= info.total_bytes);
        assert!(info.overhead >= 1.0);
        assert!(info.mean > 0.0 && info.mean <= info.peak);
    }

    #[test]
    fn rate_change_marks_dirty_but_depth_does_not() {
        let mut sound = Sound::default();
        sound.ensure_rendered();
        sound.set_pcm(44100, 8).unwrap();
        assert!(!sound.is_dirty());
        sound.set_pcm(22050, 8).unwrap();
        assert!(sound.is_dirty());
        assert!(matches!(sound.set_pcm(44100, 10), Err(ConfigError::UnsupportedBitDepth(10))));
        assert!(matches!(sound.set_pcm(0, 16), Err(ConfigError::InvalidSampleRate(0))));
    }

    #[test]
    fn user_data_is_kept() {
        let mut sound = Sound::default();
        assert!(sound.user_data().is_empty());
        sound.set_user_data(vec![1, 2, 3]);
        assert_eq!(sound.user_data(), &[1, 2, 3]);
    }

    #[test]
    fn wav_file_export() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("sfxr_core_test_{}.wav", std::process::id()));
        let mut sound = Sound::default();
        sound.export_wav_file(&path).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len() as usize, sound.quick_info().total_samples);
        std::fs::remove_file(&path).unwrap();
    }
}
