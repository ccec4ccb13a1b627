//! xorshift* 64-bit generator for the noise banks.
//!
//! Cheap and fully reproducible: the same seed always yields the same
//! noise stream, which is what makes rendered noise waveforms repeatable.

/// Constant mixed into every seed so that seed 0 still produces a
/// non-zero (and therefore non-degenerate) xorshift state.
const SEED_MIX: u64 = 0xA011_0B01_C977_4200;

/// Output multiplier of the xorshift* transform.
const SCRAMBLE: u64 = 0x2545_F491_4F6C_DD1D;

/// A xorshift* pseudo-random number generator.
#[derive(Debug, Clone)]
pub struct XorShiftStar {
    state: u64,
}

impl XorShiftStar {
    pub fn new(seed: u64) -> Self {
        XorShiftStar {
            state: seed ^ SEED_MIX,
        }
    }

    /// Reset the generator to the stream produced by `seed`.
    pub fn seed(&mut self, seed: u64) {
        self.state = seed ^ SEED_MIX;
    }

    #[inline]
    fn advance(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x
    }

    /// Next scrambled 64-bit value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.advance().wrapping_mul(SCRAMBLE)
    }

    /// Next scrambled value truncated to its low 32 bits.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    /// Uniform float in `[0, 1)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        // 24 high bits keep the quotient strictly below 1.0 in f32.
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}

impl Default for XorShiftStar {
    fn default() -> Self {
        Self::new(0)
    }
}
