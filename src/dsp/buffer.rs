//! Chunked sample accumulator.
//!
//! Synthesis does not know a sound's length up front, so samples are
//! appended into fixed 4096-sample blocks. A full block is retired into
//! the block list and a fresh one started, which keeps appends O(1)
//! without ever copying already-written audio.

use std::io::{self, Write};
use std::ops::Index;

/// Samples per block. Must stay a power of two (see [`BLOCK_SHIFT`]).
pub const BLOCK_LEN: usize = 4096;
const BLOCK_SHIFT: u32 = 12;
const BLOCK_MASK: usize = BLOCK_LEN - 1;

type Block = Box<[f32; BLOCK_LEN]>;

fn new_block() -> Block {
    Box::new([0.0; BLOCK_LEN])
}

/// On-the-wire encoding of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Raw IEEE 754 32-bit float.
    Float32,
    /// Unsigned 8-bit, offset binary (128 = silence).
    Pcm8,
    Pcm16,
    /// Packed 3-byte signed samples, no padding.
    Pcm24,
    Pcm32,
}

impl SampleEncoding {
    /// PCM encoding for a bit depth, if supported.
    pub fn pcm(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(SampleEncoding::Pcm8),
            16 => Some(SampleEncoding::Pcm16),
            24 => Some(SampleEncoding::Pcm24),
            32 => Some(SampleEncoding::Pcm32),
            _ => None,
        }
    }

    /// Encoded width of one sample in bytes.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleEncoding::Pcm8 => 1,
            SampleEncoding::Pcm16 => 2,
            SampleEncoding::Pcm24 => 3,
            SampleEncoding::Float32 | SampleEncoding::Pcm32 => 4,
        }
    }

    /// Largest positive integer a full-scale sample maps to.
    fn max_amplitude(self) -> f64 {
        match self {
            SampleEncoding::Pcm8 => i8::MAX as f64,
            SampleEncoding::Pcm16 => i16::MAX as f64,
            SampleEncoding::Pcm24 => 8_388_607.0,
            SampleEncoding::Pcm32 => i32::MAX as f64,
            SampleEncoding::Float32 => 1.0,
        }
    }

    /// Map a float sample to its integer code, clipped to the representable range.
    #[inline]
    fn quantize(self, sample: f32) -> i32 {
        let max = self.max_amplitude();
        (sample as f64 * max).round().clamp(-max, max) as i32
    }

    /// Append the encoded form of `sample` to `out`.
    #[inline]
    fn encode_into(self, sample: f32, out: &mut Vec<u8>) {
        match self {
            SampleEncoding::Float32 => out.extend_from_slice(&sample.to_le_bytes()),
            SampleEncoding::Pcm8 => out.push((self.quantize(sample) + 128) as u8),
            SampleEncoding::Pcm16 => {
                out.extend_from_slice(&(self.quantize(sample) as i16).to_le_bytes())
            }
            SampleEncoding::Pcm24 => {
                let bytes = self.quantize(sample).to_le_bytes();
                out.extend_from_slice(&bytes[..3]);
            }
            SampleEncoding::Pcm32 => out.extend_from_slice(&self.quantize(sample).to_le_bytes()),
        }
    }
}

/// Append-only float sample storage organised as 4096-sample blocks.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    retired: Vec<Block>,
    current: Block,
    pos: usize,
}

impl SampleBuffer {
    pub fn new() -> Self {
        SampleBuffer {
            retired: Vec::with_capacity(128),
            current: new_block(),
            pos: 0,
        }
    }

    /// Append one sample, retiring the current block when it fills.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.current[self.pos] = sample;
        self.pos += 1;
        if self.pos == BLOCK_LEN {
            let full = std::mem::replace(&mut self.current, new_block());
            self.retired.push(full);
            self.pos = 0;
        }
    }

    /// Total sample count: retired blocks × 4096 + current fill.
    pub fn len(&self) -> usize {
        (self.retired.len() << BLOCK_SHIFT) + self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of full blocks retired so far.
    pub fn block_count(&self) -> usize {
        self.retired.len()
    }

    /// Size of the rendered audio as raw 32-bit floats.
    pub fn size_bytes(&self) -> usize {
        self.len() * std::mem::size_of::<f32>()
    }

    /// Bytes held by the block storage, including the unfilled tail.
    pub fn memory_bytes(&self) -> usize {
        (self.retired.len() + 1) * BLOCK_LEN * std::mem::size_of::<f32>()
    }

    /// Checked indexed read.
    pub fn get(&self, index: usize) -> Option<f32> {
        if index >= self.len() {
            return None;
        }
        let block = index >> BLOCK_SHIFT;
        let offset = index & BLOCK_MASK;
        if block == self.retired.len() {
            Some(self.current[offset])
        } else {
            Some(self.retired[block][offset])
        }
    }

    /// Iterate every written sample in order.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.retired
            .iter()
            .flat_map(|block| block.iter())
            .chain(self.current[..self.pos].iter())
            .copied()
    }

    /// Multiply every written sample by `factor` in place.
    pub fn scale(&mut self, factor: f32) {
        for block in self.retired.iter_mut() {
            for s in block.iter_mut() {
                *s *= factor;
            }
        }
        for s in self.current[..self.pos].iter_mut() {
            *s *= factor;
        }
    }

    /// Peak absolute value and mean absolute value in one pass.
    /// Both are 0 for an empty buffer.
    pub fn peak_and_mean(&self) -> (f32, f32) {
        let mut peak = 0.0f32;
        let mut total = 0.0f64;
        let mut count = 0usize;
        for s in self.iter() {
            let a = s.abs();
            if a > peak {
                peak = a;
            }
            total += a as f64;
            count += 1;
        }
        if count == 0 {
            (0.0, 0.0)
        } else {
            (peak, (total / count as f64) as f32)
        }
    }

    /// Number of bytes [`write_to`](Self::write_to) produces for `encoding`.
    pub fn encoded_len(&self, encoding: SampleEncoding) -> usize {
        self.len() * encoding.bytes_per_sample()
    }

    /// Encode all samples little-endian into `sink`, one block at a time.
    ///
    /// The partial trailing block is flushed to exactly its fill length.
    pub fn write_to<W: Write>(&self, encoding: SampleEncoding, sink: &mut W) -> io::Result<()> {
        let mut scratch = Vec::with_capacity(BLOCK_LEN * encoding.bytes_per_sample());
        let full = self.retired.iter().map(|block| &block[..]);
        for chunk in full.chain(std::iter::once(&self.current[..self.pos])) {
            scratch.clear();
            for &sample in chunk {
                encoding.encode_into(sample, &mut scratch);
            }
            sink.write_all(&scratch)?;
        }
        Ok(())
    }

    /// Release all retired blocks and rewind the fill position.
    pub fn clear(&mut self) {
        self.retired.clear();
        self.pos = 0;
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for SampleBuffer {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        let len = self.len();
        assert!(index < len, "sample index {index} out of range for buffer of {len}");
        let block = index >> BLOCK_SHIFT;
        let offset = index & BLOCK_MASK;
        if block == self.retired.len() {
            &self.current[offset]
        } else {
            &self.retired[block][offset]
        }
    }
}
