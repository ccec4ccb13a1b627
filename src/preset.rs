//! Sound presets and parameter randomization.
//!
//! Each preset starts from the defaults and draws its fields from a
//! hand-tuned distribution. All randomness comes from a caller-owned
//! generator, so the same seed always yields the same sounds.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::error::ConfigError;
use crate::params::Parameters;

// ── Sound kinds ────────────────────────────────────────────

/// The seven classic sfxr sound categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundKind {
    #[serde(rename = "PICKUP/COIN")]
    PickupCoin,
    #[serde(rename = "LASER/SHOOT")]
    LaserShoot,
    #[serde(rename = "EXPLOSION")]
    Explosion,
    #[serde(rename = "POWERUP")]
    Powerup,
    #[serde(rename = "HIT/HURT")]
    HitHurt,
    #[serde(rename = "JUMP")]
    Jump,
    #[serde(rename = "BLIP/SELECT")]
    BlipSelect,
}

impl SoundKind {
    pub const ALL: [SoundKind; 7] = [
        SoundKind::PickupCoin,
        SoundKind::LaserShoot,
        SoundKind::Explosion,
        SoundKind::Powerup,
        SoundKind::HitHurt,
        SoundKind::Jump,
        SoundKind::BlipSelect,
    ];

    /// Display name, also accepted by [`SoundKind::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            SoundKind::PickupCoin => "PICKUP/COIN",
            SoundKind::LaserShoot => "LASER/SHOOT",
            SoundKind::Explosion => "EXPLOSION",
            SoundKind::Powerup => "POWERUP",
            SoundKind::HitHurt => "HIT/HURT",
            SoundKind::Jump => "JUMP",
            SoundKind::BlipSelect => "BLIP/SELECT",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| ConfigError::UnknownSoundKind(name.to_string()))
    }

    /// Reset `params` to the defaults, then draw this preset's fields.
    pub fn apply<R: RngCore + ?Sized>(self, params: &mut Parameters, rng: &mut R) {
        *params = Parameters::new();
        let mut d = Dice(rng);
        let p = params;
        match self {
            SoundKind::PickupCoin => {
                p.base_freq = 0.4 + d.frnd(0.5);
                p.env_attack = 0.0;
                p.env_sustain = d.frnd(0.1);
                p.env_decay = 0.1 + d.frnd(0.4);
                p.env_punch = 0.3 + d.frnd(0.3);
                if d.coin() {
                    p.arp_speed = 0.5 + d.frnd(0.2);
                    p.arp_mod = 0.2 + d.frnd(0.4);
                }
            }
            SoundKind::LaserShoot => {
                p.wave_type = d.rnd(2) as f32;
                if p.wave_type == 2.0 && d.coin() {
                    p.wave_type = d.rnd(1) as f32;
                }
                p.base_freq = 0.5 + d.frnd(0.5);
                p.freq_limit = (p.base_freq - 0.2 - d.frnd(0.6)).max(0.2);
                p.freq_ramp = -0.15 - d.frnd(0.2);
                if d.rnd(2) == 0 {
                    p.base_freq = 0.3 + d.frnd(0.6);
                    p.freq_limit = d.frnd(0.1);
                    p.freq_ramp = -0.35 - d.frnd(0.3);
                }
                if d.coin() {
                    p.duty = d.frnd(0.5);
                    p.duty_ramp = d.frnd(0.2);
                } else {
                    p.duty = 0.4 + d.frnd(0.5);
                    p.duty_ramp = -d.frnd(0.7);
                }
                p.env_attack = 0.0;
                p.env_sustain = 0.1 + d.frnd(0.2);
                p.env_decay = d.frnd(0.4);
                if d.coin() {
                    p.env_punch = d.frnd(0.3);
                }
                if d.rnd(2) == 0 {
                    p.pha_offset = d.frnd(0.2);
                    p.pha_ramp = -d.frnd(0.2);
                }
                if d.coin() {
                    p.hpf_freq = d.frnd(0.3);
                }
            }
            SoundKind::Explosion => {
                p.wave_type = Waveform::Noise.to_param();
                if d.coin() {
                    p.base_freq = 0.1 + d.frnd(0.4);
                    p.freq_ramp = -0.1 + d.frnd(0.4);
                } else {
                    p.base_freq = 0.2 + d.frnd(0.7);
                    p.freq_ramp = -0.2 - d.frnd(0.2);
                }
                p.base_freq *= p.base_freq;
                if d.rnd(4) == 0 {
                    p.freq_ramp = 0.0;
                }
                if d.rnd(2) == 0 {
                    p.repeat_speed = 0.3 + d.frnd(0.5);
                }
                p.env_attack = 0.0;
                p.env_sustain = 0.1 + d.frnd(0.3);
                p.env_decay = d.frnd(0.5);
                if !d.coin() {
                    p.pha_offset = -0.3 + d.frnd(0.9);
                    p.pha_ramp = -d.frnd(0.3);
                }
                p.env_punch = 0.2 + d.frnd(0.6);
                if d.coin() {
                    p.vib_strength = d.frnd(0.7);
                    p.vib_speed = d.frnd(0.6);
                }
                if d.rnd(2) == 0 {
                    p.arp_speed = 0.6 + d.frnd(0.3);
                    p.arp_mod = 0.8 - d.frnd(1.6);
                }
            }
            SoundKind::Powerup => {
                if d.coin() {
                    p.wave_type = Waveform::Sawtooth.to_param();
                } else {
                    p.duty = d.frnd(0.6);
                }
                p.base_freq = 0.2 + d.frnd(0.3);
                if d.coin() {
                    p.freq_ramp = 0.1 + d.frnd(0.4);
                    p.repeat_speed = 0.4 + d.frnd(0.4);
                } else {
                    p.freq_ramp = 0.05 + d.frnd(0.2);
                    if d.coin() {
                        p.vib_strength = d.frnd(0.7);
                        p.vib_speed = d.frnd(0.6);
                    }
                }
                p.env_attack = 0.0;
                p.env_sustain = d.frnd(0.4);
                p.env_decay = 0.1 + d.frnd(0.4);
            }
            SoundKind::HitHurt => {
                p.wave_type = match d.rnd(2) {
                    0 => Waveform::Square,
                    1 => Waveform::Sawtooth,
                    _ => Waveform::Noise,
                }
                .to_param();
                if p.wave_type == 0.0 {
                    p.duty = d.frnd(0.6);
                }
                p.base_freq = 0.2 + d.frnd(0.6);
                p.freq_ramp = -0.3 - d.frnd(0.4);
                p.env_attack = 0.0;
                p.env_sustain = d.frnd(0.1);
                p.env_decay = 0.1 + d.frnd(0.2);
                if d.coin() {
                    p.hpf_freq = d.frnd(0.3);
                }
            }
            SoundKind::Jump => {
                p.wave_type = Waveform::Square.to_param();
                p.duty = d.frnd(0.6);
                p.base_freq = 0.3 + d.frnd(0.3);
                p.freq_ramp = 0.1 + d.frnd(0.2);
                p.env_attack = 0.0;
                p.env_sustain = 0.1 + d.frnd(0.3);
                p.env_decay = 0.1 + d.frnd(0.2);
                if d.coin() {
                    p.hpf_freq = d.frnd(0.3);
                }
                if d.coin() {
                    p.lpf_freq = 1.0 - d.frnd(0.6);
                }
            }
            SoundKind::BlipSelect => {
                p.wave_type = d.rnd(1) as f32;
                if p.wave_type == 0.0 {
                    p.duty = d.frnd(0.6);
                }
                p.base_freq = 0.2 + d.frnd(0.4);
                p.env_attack = 0.0;
                p.env_sustain = 0.1 + d.frnd(0.1);
                p.env_decay = d.frnd(0.2);
                p.hpf_freq = 0.1;
            }
        }
    }
}

impl fmt::Display for SoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SoundKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

// ── Randomization ──────────────────────────────────────────

/// The integer/float draws every distribution is written in terms of.
struct Dice<'a, R: RngCore + ?Sized>(&'a mut R);

impl<R: RngCore + ?Sized> Dice<'_, R> {
    /// Uniform integer in `0..=n`.
    fn rnd(&mut self, n: u32) -> u32 {
        self.0.next_u32() % (n + 1)
    }

    /// Uniform float in `[0, range]` on a 1/10000 grid.
    fn frnd(&mut self, range: f32) -> f32 {
        self.rnd(10000) as f32 / 10000.0 * range
    }

    /// Symmetric draw in `[-1, 1]`.
    fn sym(&mut self) -> f32 {
        self.frnd(2.0) - 1.0
    }

    fn coin(&mut self) -> bool {
        self.rnd(1) == 1
    }
}

/// Replace every shaping field with a fresh random value. The waveform
/// is left as it is.
pub fn randomize<R: RngCore + ?Sized>(p: &mut Parameters, rng: &mut R) {
    let mut d = Dice(rng);

    p.base_freq = d.sym().powi(2);
    if d.coin() {
        p.base_freq = d.sym().powi(3) + 0.5;
    }
    p.freq_limit = 0.0;
    p.freq_ramp = d.sym().powi(5);
    if p.base_freq > 0.7 && p.freq_ramp > 0.2 {
        p.freq_ramp = -p.freq_ramp;
    }
    if p.base_freq < 0.2 && p.freq_ramp < -0.05 {
        p.freq_ramp = -p.freq_ramp;
    }
    p.freq_dramp = d.sym().powi(3);
    p.duty = d.sym();
    p.duty_ramp = d.sym().powi(3);
    p.vib_strength = d.sym().powi(3);
    p.vib_speed = d.sym();
    p.vib_delay = d.sym();
    p.env_attack = d.sym().powi(3);
    p.env_sustain = d.sym().powi(2);
    p.env_decay = d.sym();
    p.env_punch = d.frnd(0.8).powi(2);
    if p.env_attack + p.env_sustain + p.env_decay < 0.2 {
        p.env_sustain += 0.2 + d.frnd(0.3);
        p.env_decay += 0.2 + d.frnd(0.3);
    }
    p.lpf_resonance = d.sym();
    p.lpf_freq = 1.0 - d.frnd(1.0).powi(3);
    p.lpf_ramp = d.sym().powi(3);
    if p.lpf_freq < 0.1 && p.lpf_ramp < -0.05 {
        p.lpf_ramp = -p.lpf_ramp;
    }
    p.hpf_freq = d.frnd(1.0).powi(5);
    p.hpf_ramp = d.sym().powi(5);
    p.pha_offset = d.sym().powi(3);
    p.pha_ramp = d.sym().powi(3);
    p.repeat_speed = d.sym();
    p.arp_speed = d.sym();
    p.arp_mod = d.sym();
}

/// Nudge each shaping field, with probability 1/2, by up to
/// `±0.05 · amount`.
pub fn mutate<R: RngCore + ?Sized>(p: &mut Parameters, rng: &mut R, amount: f32) {
    let mut d = Dice(rng);
    let fields: [&mut f32; 22] = [
        &mut p.base_freq,
        &mut p.freq_ramp,
        &mut p.freq_dramp,
        &mut p.duty,
        &mut p.duty_ramp,
        &mut p.vib_strength,
        &mut p.vib_speed,
        &mut p.vib_delay,
        &mut p.env_attack,
        &mut p.env_sustain,
        &mut p.env_decay,
        &mut p.env_punch,
        &mut p.lpf_resonance,
        &mut p.lpf_freq,
        &mut p.lpf_ramp,
        &mut p.hpf_freq,
        &mut p.hpf_ramp,
        &mut p.pha_offset,
        &mut p.pha_ramp,
        &mut p.repeat_speed,
        &mut p.arp_speed,
        &mut p.arp_mod,
    ];
    for field in fields {
        if d.coin() {
            *field += (d.frnd(0.1) - 0.05) * amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_pcg::Pcg32;

    fn rng(seed: u64) -> Pcg32 {
        Pcg32::new(0x6350_5020_5366_7872 ^ seed, 0x6D75_7261_6761_6D69 & seed)
    }

    #[test]
    fn names_round_trip() {
        for kind in SoundKind::ALL {
            assert_eq!(SoundKind::from_name(kind.name()).unwrap(), kind);
            assert_eq!(kind.to_string().parse::<SoundKind>().unwrap(), kind);
        }
        assert!(matches!(
            SoundKind::from_name("jump"),
            Err(ConfigError::UnknownSoundKind(_))
        ));
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&SoundKind::HitHurt).unwrap();
        assert_eq!(json, "\"HIT/HURT\"");
        let back: SoundKind = serde_json::from_str("\"BLIP/SELECT\"").unwrap();
        assert_eq!(back, SoundKind::BlipSelect);
    }

    #[test]
    fn presets_are_reproducible() {
        for kind in SoundKind::ALL {
            let (mut a, mut b) = (Parameters::new(), Parameters::new());
            kind.apply(&mut a, &mut rng(7));
            kind.apply(&mut b, &mut rng(7));
            assert_eq!(a, b, "{kind} differs for the same seed");
        }
    }

    #[test]
    fn jump_is_square_with_no_attack() {
        let mut r = rng(3);
        for _ in 0..50 {
            let mut p = Parameters::new();
            SoundKind::Jump.apply(&mut p, &mut r);
            assert_eq!(p.waveform(), Some(Waveform::Square));
            assert_eq!(p.env_attack, 0.0);
            assert!((0.3..=0.6).contains(&p.base_freq));
        }
    }

    #[test]
    fn preset_waveforms_follow_distribution() {
        let mut r = rng(11);
        for _ in 0..100 {
            let mut p = Parameters::new();
            SoundKind::Explosion.apply(&mut p, &mut r);
            assert_eq!(p.waveform(), Some(Waveform::Noise));

            SoundKind::HitHurt.apply(&mut p, &mut r);
            assert!(matches!(
                p.waveform(),
                Some(Waveform::Square | Waveform::Sawtooth | Waveform::Noise)
            ));

            SoundKind::BlipSelect.apply(&mut p, &mut r);
            assert!(matches!(p.waveform(), Some(Waveform::Square | Waveform::Sawtooth)));
            assert_eq!(p.hpf_freq, 0.1);

            SoundKind::LaserShoot.apply(&mut p, &mut r);
            assert!(matches!(
                p.waveform(),
                Some(Waveform::Square | Waveform::Sawtooth | Waveform::Sine)
            ));
        }
    }

    #[test]
    fn preset_starts_from_defaults() {
        let mut p = Parameters::new();
        p.compress = 0.9;
        p.decimate = 3.0;
        SoundKind::PickupCoin.apply(&mut p, &mut rng(1));
        assert_eq!(p.compress, 0.0);
        assert_eq!(p.decimate, 0.0);
    }

    #[test]
    fn randomize_rescues_short_envelopes() {
        let mut r = rng(5);
        for _ in 0..200 {
            let mut p = Parameters::new();
            randomize(&mut p, &mut r);
            let total = p.env_attack + p.env_sustain + p.env_decay;
            assert!(
                total >= 0.2 - 1e-6 || p.env_sustain >= 0.2,
                "Short envelope was not rescued: {p:?}"
            );
            assert!((0.0..=1.0).contains(&p.hpf_freq));
            assert!(p.lpf_freq <= 1.0);
            assert_eq!(p.freq_limit, 0.0);
        }
    }

    #[test]
    fn mutate_leaves_structural_fields_alone() {
        let mut p = Parameters::new();
        p.wave_type = 3.0;
        p.decimate = 4.0;
        p.compress = 0.5;
        p.freq_limit = 0.2;
        let before = p;
        let mut r = rng(9);
        for _ in 0..20 {
            mutate(&mut p, &mut r, 1.0);
        }
        assert_eq!(p.wave_type, before.wave_type);
        assert_eq!(p.decimate, before.decimate);
        assert_eq!(p.compress, before.compress);
        assert_eq!(p.freq_limit, before.freq_limit);
        assert_ne!(p, before, "Twenty mutations should change something");
    }

    #[test]
    fn mutate_step_is_bounded() {
        let mut r = rng(13);
        for _ in 0..100 {
            let before = Parameters::new();
            let mut p = before;
            mutate(&mut p, &mut r, 2.0);
            let (a, b) = (before.to_slots(), p.to_slots());
            for i in 0..a.len() {
                assert!((a[i] - b[i]).abs() <= 0.1 + 1e-6, "Slot {i} moved too far");
            }
        }
    }

    #[test]
    fn zero_amount_mutation_is_identity() {
        let mut p = Parameters::new();
        mutate(&mut p, &mut rng(2), 0.0);
        assert_eq!(p, Parameters::new());
    }
}
