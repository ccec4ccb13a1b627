//! Attack / sustain / decay envelope with sustain punch.

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Attack,
    Sustain,
    Decay,
    Stopped,
}

impl Stage {
    fn next(self) -> Stage {
        match self {
            Stage::Attack => Stage::Sustain,
            Stage::Sustain => Stage::Decay,
            Stage::Decay | Stage::Stopped => Stage::Stopped,
        }
    }
}

/// Stage length in samples for a normalized duration parameter.
pub fn stage_length(param: f32) -> f32 {
    (param * param * 100_000.0).trunc()
}

/// Time-driven volume envelope.
///
/// Attack ramps 0 → 1, sustain holds 1 plus a punch boost that fades over
/// the sustain window, decay ramps 1 → 0. An envelope with any non-empty
/// stage always opens on one silent attack sample; zero-length sustain and
/// decay stages are skipped.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Extra sustain level at the start of the sustain stage.
    pub punch: f32,
    stage: Stage,
    time: f32,
    lengths: [f32; 3],
}

impl Envelope {
    pub fn new() -> Self {
        Envelope {
            punch: 0.0,
            stage: Stage::Stopped,
            time: 0.0,
            lengths: [0.0; 3],
        }
    }

    /// Start a new envelope from normalized attack/sustain/decay durations.
    pub fn trigger(&mut self, attack: f32, sustain: f32, decay: f32, punch: f32) {
        self.lengths = [stage_length(attack), stage_length(sustain), stage_length(decay)];
        self.punch = punch;
        self.time = 0.0;
        self.stage = if self.lengths.iter().any(|&len| len > 0.0) {
            Stage::Attack
        } else {
            Stage::Stopped
        };
    }

    /// Volume at the current time, then advance time by `step`.
    ///
    /// Returns `None` once the decay stage has completed.
    pub fn next_volume(&mut self, step: f32) -> Option<f32> {
        let volume = match self.stage {
            Stage::Attack if self.lengths[0] > 0.0 => self.time / self.lengths[0],
            Stage::Attack => 0.0,
            Stage::Sustain => 1.0 + (1.0 - self.time / self.lengths[1]) * 2.0 * self.punch,
            Stage::Decay => 1.0 - self.time / self.lengths[2],
            Stage::Stopped => return None,
        };

        self.time += step;
        if self.time > self.current_length() {
            self.time = 0.0;
            self.stage = self.stage.next();
            self.skip_empty_stages();
        }
        Some(volume)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Returns true once the decay stage has completed.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Stopped
    }

    /// Total samples the envelope produces at a step of 1.0.
    pub fn total_samples(&self) -> usize {
        let stages: usize = self
            .lengths
            .iter()
            .filter(|&&len| len > 0.0)
            .map(|&len| len as usize + 1)
            .sum();
        // Silent lead-in sample when the attack is empty.
        if stages > 0 && self.lengths[0] <= 0.0 {
            stages + 1
        } else {
            stages
        }
    }

    fn current_length(&self) -> f32 {
        match self.stage {
            Stage::Attack => self.lengths[0],
            Stage::Sustain => self.lengths[1],
            Stage::Decay => self.lengths[2],
            Stage::Stopped => 0.0,
        }
    }

    fn skip_empty_stages(&mut self) {
        while self.stage != Stage::Stopped && self.current_length() <= 0.0 {
            self.stage = self.stage.next();
        }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}
