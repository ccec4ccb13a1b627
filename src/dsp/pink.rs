//! Pink noise via the Voss-McCartney algorithm.
//!
//! Five "octave" rows each hold one uniform value. A 5-bit counter is
//! incremented per sample and only the rows whose counter bit flipped are
//! redrawn, so low rows change often and high rows rarely. Summing them
//! gives an approximately 1/f spectrum.

use super::rng::XorShiftStar;

const ROWS: usize = 5;
const MAX_KEY: u32 = 0x1f;

/// Default output range of [`PinkNoise::next_value`].
pub const DEFAULT_RANGE: u32 = 65536;

#[derive(Debug, Clone)]
pub struct PinkNoise {
    rng: XorShiftStar,
    key: u32,
    range: u32,
    rows: [u32; ROWS],
}

impl PinkNoise {
    /// Create a generator whose summed output lies in `[0, range)`.
    pub fn new(range: u32, seed: u64) -> Self {
        let mut pink = PinkNoise {
            rng: XorShiftStar::new(seed),
            key: 0,
            range: range.max(ROWS as u32),
            rows: [0; ROWS],
        };
        pink.fill_rows();
        pink
    }

    /// Restart from the state `new(range, seed)` would produce.
    pub fn reseed(&mut self, seed: u64) {
        self.rng.seed(seed);
        self.key = 0;
        self.fill_rows();
    }

    fn fill_rows(&mut self) {
        for i in 0..ROWS {
            self.rows[i] = self.draw();
        }
    }

    #[inline]
    fn draw(&mut self) -> u32 {
        self.rng.next_u32() % (self.range / ROWS as u32)
    }

    /// Advance the counter and return the sum of all rows.
    pub fn next_value(&mut self) -> u32 {
        let last_key = self.key;
        self.key = if self.key >= MAX_KEY { 0 } else { self.key + 1 };

        let flipped = last_key ^ self.key;
        let mut sum = 0;
        for i in 0..ROWS {
            if flipped & (1 << i) != 0 {
                self.rows[i] = self.draw();
            }
            sum += self.rows[i];
        }
        sum
    }

    /// Next value normalized to `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        self.next_value() as f32 / self.range as f32
    }
}

impl Default for PinkNoise {
    fn default() -> Self {
        Self::new(DEFAULT_RANGE, 0)
    }
}
