//! Render configuration: output rate, PCM depth, mode flags, noise seed.

use serde::{Deserialize, Serialize};

use crate::dsp::buffer::SampleEncoding;
use crate::dsp::engine::BASE_SAMPLE_RATE;
use crate::error::{ConfigError, LoadError};
use crate::params::BlockFormat;

/// Optional behaviors applied around synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderMode {
    /// Scale each rendered buffer so its peak is exactly 1.0.
    pub normalize: bool,
    /// Quantize parameters to 16-bit words before synthesis and use the
    /// word-sized parameter block.
    pub word_params: bool,
}

/// How sounds are rendered and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output sample rate in Hz. Rates other than 44100 are experimental.
    pub sample_rate: u32,
    /// PCM bit depth used by WAV PCM export: 8, 16, 24 or 32.
    pub bit_depth: u32,
    pub mode: RenderMode,
    /// Seed for the white and pink noise generators.
    pub noise_seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            sample_rate: BASE_SAMPLE_RATE,
            bit_depth: 16,
            mode: RenderMode::default(),
            noise_seed: 0,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_sample_rate(self.sample_rate)?;
        validate_bit_depth(self.bit_depth)?;
        Ok(())
    }

    /// Parameter block layout implied by the mode flags.
    pub fn block_format(&self) -> BlockFormat {
        if self.mode.word_params {
            BlockFormat::Word
        } else {
            BlockFormat::Plain
        }
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, crate::error::SfxrError> {
        let config: RenderConfig = serde_json::from_str(json).map_err(LoadError::from)?;
        config.validate()?;
        Ok(config)
    }
}

pub fn validate_sample_rate(sample_rate: u32) -> Result<(), ConfigError> {
    if sample_rate == 0 {
        return Err(ConfigError::InvalidSampleRate(sample_rate));
    }
    Ok(())
}

pub fn validate_bit_depth(bit_depth: u32) -> Result<(), ConfigError> {
    SampleEncoding::pcm(bit_depth)
        .map(|_| ())
        .ok_or(ConfigError::UnsupportedBitDepth(bit_depth))
}
