//! Raw (unfiltered) sfxr oscillators, including the noise banks.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::pink::PinkNoise;
use super::rng::XorShiftStar;

/// Length of the white/pink noise banks redrawn once per period.
pub const NOISE_BANK_LEN: usize = 32;

/// Initial state of the 15-bit one-bit-noise LFSR.
const LFSR_SEED: i32 = 1 << 14;

/// Supported waveform shapes, in parameter-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Square,
    Sawtooth,
    Sine,
    Noise,
    Triangle,
    Pink,
    Tan,
    Breaker,
    OneBit,
}

impl Waveform {
    pub const ALL: [Waveform; 9] = [
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Sine,
        Waveform::Noise,
        Waveform::Triangle,
        Waveform::Pink,
        Waveform::Tan,
        Waveform::Breaker,
        Waveform::OneBit,
    ];

    /// Decode the `WAVE TYPE` parameter (truncated toward zero).
    pub fn from_param(value: f32) -> Option<Waveform> {
        let index = value as i32;
        if index < 0 {
            return None;
        }
        Self::ALL.get(index as usize).copied()
    }

    /// The `WAVE TYPE` parameter value selecting this waveform.
    pub fn to_param(self) -> f32 {
        self as u8 as f32
    }
}

/// Phase accumulator plus per-period noise state for one sound.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Option<Waveform>,
    /// Square wave duty threshold as a fraction of the period.
    pub duty: f32,
    phase: f32,
    period: f32,
    noise_bank: [f32; NOISE_BANK_LEN],
    pink_bank: [f32; NOISE_BANK_LEN],
    lfsr: i32,
    one_bit: f64,
}

impl Oscillator {
    pub fn new() -> Self {
        Oscillator {
            waveform: Some(Waveform::Square),
            duty: 0.5,
            phase: 0.0,
            period: 8.0,
            noise_bank: [0.0; NOISE_BANK_LEN],
            pink_bank: [0.0; NOISE_BANK_LEN],
            lfsr: LFSR_SEED,
            one_bit: 0.0,
        }
    }

    /// Full reset for a new sound: rewinds the phase and the LFSR and
    /// fills both noise banks from the (already reseeded) generators.
    pub fn reset(&mut self, rng: &mut XorShiftStar, pink: &mut PinkNoise) {
        self.phase = 0.0;
        self.lfsr = LFSR_SEED;
        self.one_bit = 0.0;
        for i in 0..NOISE_BANK_LEN {
            self.noise_bank[i] = rng.next_f32() * 2.0 - 1.0;
            self.pink_bank[i] = pink.next_f32() * 2.0 - 1.0;
        }
    }

    /// Set the oscillator period in (supersampled) samples.
    pub fn set_period(&mut self, period: f32) {
        self.period = period;
    }

    /// Advance the phase by `step` and return the raw waveform value.
    ///
    /// On wraparound the active noise source is refreshed. The tangent
    /// wave is unbounded and returned as-is.
    pub fn next_sample(&mut self, step: f32, rng: &mut XorShiftStar, pink: &mut PinkNoise) -> f32 {
        self.phase += step;
        if self.phase >= self.period {
            self.phase %= self.period;
            self.refresh_noise(rng, pink);
        }

        let fp = self.phase / self.period;
        match self.waveform {
            Some(Waveform::Square) => {
                if fp < self.duty {
                    0.5
                } else {
                    -0.5
                }
            }
            Some(Waveform::Sawtooth) => 1.0 - fp * 2.0,
            Some(Waveform::Sine) => (fp as f64 * 2.0 * PI).sin() as f32,
            Some(Waveform::Noise) => self.noise_bank[self.bank_index()],
            Some(Waveform::Triangle) => (1.0 - fp * 2.0).abs() - 1.0,
            Some(Waveform::Pink) => self.pink_bank[self.bank_index()],
            Some(Waveform::Tan) => (std::f32::consts::PI * fp).tan(),
            Some(Waveform::Breaker) => {
                let amp = fp as f64;
                (1.0 - amp * amp * 2.0).abs() as f32 - 1.0
            }
            Some(Waveform::OneBit) => self.one_bit as f32,
            None => 0.0,
        }
    }

    #[inline]
    fn bank_index(&self) -> usize {
        ((self.phase * NOISE_BANK_LEN as f32 / self.period) as usize).min(NOISE_BANK_LEN - 1)
    }

    fn refresh_noise(&mut self, rng: &mut XorShiftStar, pink: &mut PinkNoise) {
        match self.waveform {
            Some(Waveform::Noise) => {
                for s in self.noise_bank.iter_mut() {
                    *s = rng.next_f32() * 2.0 - 1.0;
                }
            }
            Some(Waveform::Pink) => {
                for s in self.pink_bank.iter_mut() {
                    *s = pink.next_f32() * 2.0 - 1.0;
                }
            }
            Some(Waveform::OneBit) => {
                let feed = ((self.lfsr >> 1) & 1) ^ (self.lfsr & 1);
                self.lfsr = (self.lfsr >> 1) | (feed << 14);
                self.one_bit = (!self.lfsr & 1) as f64 - 0.5;
            }
            _ => {}
        }
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}
