//! Phaser — a swept comb filter built on a 1024-slot circular history.

/// History length; the tap offset is clamped below this.
pub const PHASER_LEN: usize = 1024;
const PHASER_MASK: usize = PHASER_LEN - 1;

/// Mixes each sample with a copy of itself from `offset` samples earlier.
///
/// The offset is swept by `sweep` once per output sample, so the comb
/// notches move over the course of the sound.
#[derive(Debug, Clone)]
pub struct Phaser {
    history: Box<[f32; PHASER_LEN]>,
    write_pos: f32,
    /// Fractional tap offset (signed; its magnitude selects the tap).
    offset: f32,
    /// Offset change per output sample.
    pub sweep: f32,
    tap: usize,
}

impl Phaser {
    pub fn new() -> Self {
        Phaser {
            history: Box::new([0.0; PHASER_LEN]),
            write_pos: 0.0,
            offset: 0.0,
            sweep: 0.0,
            tap: 0,
        }
    }

    /// Configure from the `PHASER OFFSET` / `PHASER SWEEP` parameters and
    /// clear the history.
    pub fn configure(&mut self, offset: f32, sweep: f32) {
        self.offset = offset.powi(2) * 1020.0 * offset.signum();
        self.sweep = sweep.powi(2) * sweep.signum();
        self.tap = self.offset.abs().trunc() as usize;
        self.clear();
    }

    /// Move the tap; called once per output sample.
    #[inline]
    pub fn advance(&mut self, step: f32) {
        self.offset += self.sweep * step;
        self.tap = (self.offset.abs().trunc() as usize).min(PHASER_LEN - 1);
    }

    /// Current tap distance in samples.
    pub fn tap(&self) -> usize {
        self.tap
    }

    /// Record `input` and return it summed with the delayed tap.
    #[inline]
    pub fn process(&mut self, input: f32, step: f32) -> f32 {
        let pos = self.write_pos as usize & PHASER_MASK;
        self.history[pos] = input;
        let delayed = self.history[(pos + PHASER_LEN - self.tap) & PHASER_MASK];
        self.write_pos = ((self.write_pos + step) as usize & PHASER_MASK) as f32;
        input + delayed
    }

    fn clear(&mut self) {
        self.history.fill(0.0);
        self.write_pos = 0.0;
    }
}

impl Default for Phaser {
    fn default() -> Self {
        Self::new()
    }
}
