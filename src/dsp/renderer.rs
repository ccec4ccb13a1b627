//! Export — encodes a rendered [`SampleBuffer`] as raw samples or a WAV file.

use std::io::Write;

use serde::{Deserialize, Serialize};

use super::buffer::{SampleBuffer, SampleEncoding};
use crate::error::{ConfigError, SfxrError};

/// Size of the canonical PCM WAV header.
pub const WAV_PCM_HEADER_LEN: usize = 44;
/// Size of the IEEE float WAV header (fmt chunk carries a zero `cbSize`).
pub const WAV_FLOAT_HEADER_LEN: usize = 46;

const FORMAT_TAG_PCM: u16 = 1;
const FORMAT_TAG_FLOAT: u16 = 3;

/// Output container and sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// WAV file at the configured PCM bit depth.
    WavePcm,
    /// WAV file of 32-bit IEEE floats.
    WaveFloat,
    Pcm8,
    Pcm16,
    Pcm24,
    Pcm32,
    /// Headerless 32-bit floats.
    Float,
}

impl ExportFormat {
    /// Bytes written ahead of the sample payload.
    pub fn header_len(self) -> usize {
        match self {
            ExportFormat::WavePcm => WAV_PCM_HEADER_LEN,
            ExportFormat::WaveFloat => WAV_FLOAT_HEADER_LEN,
            _ => 0,
        }
    }

    /// The fixed bit depth of a raw PCM format.
    pub fn forced_bit_depth(self) -> Option<u32> {
        match self {
            ExportFormat::Pcm8 => Some(8),
            ExportFormat::Pcm16 => Some(16),
            ExportFormat::Pcm24 => Some(24),
            ExportFormat::Pcm32 => Some(32),
            _ => None,
        }
    }

    /// Raw PCM format for a bit depth.
    pub fn pcm(bit_depth: u32) -> Result<Self, ConfigError> {
        match bit_depth {
            8 => Ok(ExportFormat::Pcm8),
            16 => Ok(ExportFormat::Pcm16),
            24 => Ok(ExportFormat::Pcm24),
            32 => Ok(ExportFormat::Pcm32),
            other => Err(ConfigError::UnsupportedBitDepth(other)),
        }
    }

    /// Per-sample encoding, resolving `WavePcm` through `bit_depth`.
    pub fn encoding(self, bit_depth: u32) -> Result<SampleEncoding, ConfigError> {
        match self {
            ExportFormat::WaveFloat | ExportFormat::Float => Ok(SampleEncoding::Float32),
            ExportFormat::WavePcm => {
                SampleEncoding::pcm(bit_depth).ok_or(ConfigError::UnsupportedBitDepth(bit_depth))
            }
            raw => {
                let bits = raw.forced_bit_depth().unwrap_or(bit_depth);
                SampleEncoding::pcm(bits).ok_or(ConfigError::UnsupportedBitDepth(bits))
            }
        }
    }

    /// Total encoded size: header plus payload.
    pub fn export_size(self, buffer: &SampleBuffer, bit_depth: u32) -> Result<usize, ConfigError> {
        Ok(self.header_len() + buffer.encoded_len(self.encoding(bit_depth)?))
    }
}

/// Write `buffer` to `sink` in `format`.
pub fn export<W: Write>(
    buffer: &SampleBuffer,
    format: ExportFormat,
    sample_rate: u32,
    bit_depth: u32,
    sink: &mut W,
) -> Result<(), SfxrError> {
    let encoding = format.encoding(bit_depth)?;
    let data_len = buffer.encoded_len(encoding);
    if matches!(format, ExportFormat::WavePcm | ExportFormat::WaveFloat) {
        write_wav_header(sink, encoding, sample_rate, data_len)?;
    }
    buffer.write_to(encoding, sink)?;
    Ok(())
}

/// Export into a freshly allocated byte vector.
pub fn export_bytes(
    buffer: &SampleBuffer,
    format: ExportFormat,
    sample_rate: u32,
    bit_depth: u32,
) -> Result<Vec<u8>, SfxrError> {
    let mut out = Vec::with_capacity(format.export_size(buffer, bit_depth)?);
    export(buffer, format, sample_rate, bit_depth, &mut out)?;
    Ok(out)
}

/// Write a mono RIFF/WAVE header for `data_len` payload bytes.
///
/// Float data gets an 18-byte fmt chunk (format tag 3, `cbSize` 0);
/// integer PCM gets the classic 16-byte one.
pub fn write_wav_header<W: Write>(
    sink: &mut W,
    encoding: SampleEncoding,
    sample_rate: u32,
    data_len: usize,
) -> std::io::Result<()> {
    let channels: u16 = 1;
    let bytes_per_sample = encoding.bytes_per_sample() as u16;
    let bits_per_sample = bytes_per_sample * 8;
    let block_align = channels * bytes_per_sample;
    let byte_rate = sample_rate * block_align as u32;
    let is_float = encoding == SampleEncoding::Float32;
    let (fmt_len, format_tag, header_len) = if is_float {
        (18u32, FORMAT_TAG_FLOAT, WAV_FLOAT_HEADER_LEN)
    } else {
        (16u32, FORMAT_TAG_PCM, WAV_PCM_HEADER_LEN)
    };
    let data_size = data_len as u32;
    let riff_size = (header_len - 8) as u32 + data_size;

    let mut buf = Vec::with_capacity(header_len);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&riff_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&fmt_len.to_le_bytes());
    buf.extend_from_slice(&format_tag.to_le_bytes());
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());
    if is_float {
        buf.extend_from_slice(&0u16.to_le_bytes()); // cbSize
    }

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());

    sink.write_all(&buf)
}
