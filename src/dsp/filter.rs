//! One-pole resonant low-pass and leaky high-pass filters.
//!
//! Both run at the supersampled rate inside the engine. Cutoffs are
//! normalized parameters, not Hz, and sweep multiplicatively.

/// Resonant low-pass: a leaky integrator with a damping term.
#[derive(Debug, Clone)]
pub struct LowPass {
    /// Cutoff coefficient, clamped to [0, 0.1].
    pub cutoff: f32,
    /// Per-sample multiplicative cutoff sweep.
    pub sweep: f32,
    /// Damping derived from resonance; higher = less ringing.
    pub damping: f32,
    /// A cutoff parameter of exactly 1.0 bypasses the filter.
    pub bypass: bool,
    position: f32,
    velocity: f32,
}

impl LowPass {
    pub fn new() -> Self {
        LowPass {
            cutoff: 0.1,
            sweep: 1.0,
            damping: 0.8,
            bypass: true,
            position: 0.0,
            velocity: 0.0,
        }
    }

    /// Configure from the `LP FILTER *` parameters and clear state.
    pub fn configure(&mut self, freq: f32, ramp: f32, resonance: f32) {
        self.cutoff = freq.powi(3) * 0.1;
        self.sweep = 1.0 + ramp * 0.0001;
        self.damping = (5.0 / (1.0 + resonance.powi(2) * 20.0) * (0.01 + self.cutoff)).min(0.8);
        self.bypass = freq == 1.0;
        self.reset();
    }

    /// Sweep the cutoff and filter one sample.
    #[inline]
    pub fn process(&mut self, input: f32, step: f32) -> f32 {
        self.cutoff = (self.cutoff * self.sweep * step).clamp(0.0, 0.1);
        if self.bypass {
            self.position = input;
            self.velocity = 0.0;
        } else {
            self.velocity += (input - self.position) * self.cutoff;
            self.velocity -= self.velocity * self.damping;
        }
        self.position += self.velocity;
        self.position
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
        self.velocity = 0.0;
    }
}

impl Default for LowPass {
    fn default() -> Self {
        Self::new()
    }
}

/// High-pass: accumulates input differences and leaks by `cutoff`.
#[derive(Debug, Clone)]
pub struct HighPass {
    /// Leak coefficient, clamped to [0.00001, 0.1] while sweeping.
    pub cutoff: f32,
    /// Per-sample multiplicative cutoff sweep.
    pub sweep: f32,
    accumulator: f32,
    last_input: f32,
}

impl HighPass {
    pub fn new() -> Self {
        HighPass {
            cutoff: 0.0,
            sweep: 1.0,
            accumulator: 0.0,
            last_input: 0.0,
        }
    }

    /// Configure from the `HP FILTER *` parameters and clear state.
    pub fn configure(&mut self, freq: f32, ramp: f32) {
        self.cutoff = freq.powi(2) * 0.1;
        self.sweep = 1.0 + ramp * 0.0003;
        self.reset();
    }

    /// Advance the cutoff sweep; called once per output sample.
    #[inline]
    pub fn advance_sweep(&mut self, step: f32) {
        if self.sweep != 0.0 {
            self.cutoff = (self.cutoff * self.sweep * step).clamp(0.00001, 0.1);
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.accumulator += input - self.last_input;
        self.last_input = input;
        self.accumulator -= self.accumulator * self.cutoff;
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.last_input = 0.0;
    }
}

impl Default for HighPass {
    fn default() -> Self {
        Self::new()
    }
}
