//! Synthesis engine — turns a [`Parameters`] set into mono float samples.
//!
//! One output sample is produced per iteration: the per-sample modulators
//! (repeat, arpeggio, slide, vibrato, duty sweep, envelope, phaser and
//! high-pass sweeps) are stepped once, then the oscillator and filter
//! chain run eight times and are averaged. Decimation, compression, the
//! master gain and a hard clip are applied last.

use crate::params::Parameters;

use super::buffer::SampleBuffer;
use super::envelope::Envelope;
use super::filter::{HighPass, LowPass};
use super::oscillator::Oscillator;
use super::phaser::Phaser;
use super::pink::{DEFAULT_RANGE, PinkNoise};
use super::rng::XorShiftStar;

/// Hard cap on the samples a single render may produce.
pub const MAX_SAMPLES: usize = 1 << 23;

/// Rate the parameter timings are defined against.
pub const BASE_SAMPLE_RATE: u32 = 44_100;

const SUPERSAMPLE: usize = 8;
const MASTER_VOLUME: f32 = 0.25;
const MIN_PERIOD: f32 = 8.0;
const MAX_DECIMATE_BITS: i32 = 24;

/// Renders one sound. Owns every piece of per-render DSP state.
#[derive(Debug, Clone)]
pub struct SynthEngine {
    params: Parameters,
    sound_volume: f32,
    /// Time advance per output sample (44100 / output rate).
    step: f32,
    noise_seed: u64,
    max_samples: usize,

    osc: Oscillator,
    envelope: Envelope,
    lowpass: LowPass,
    highpass: HighPass,
    phaser: Phaser,
    rng: XorShiftStar,
    pink: PinkNoise,

    fperiod: f64,
    fmaxperiod: f64,
    fslide: f64,
    fdslide: f64,
    duty_slide: f32,
    arp_mod: f64,
    arp_time: f32,
    arp_limit: f32,
    vib_phase: f32,
    vib_speed: f32,
    vib_amp: f32,
    rep_time: f32,
    rep_limit: f32,
    playing: bool,
    truncated: bool,
}

impl SynthEngine {
    pub fn new(params: Parameters, sound_volume: f32, sample_rate: u32, noise_seed: u64) -> Self {
        SynthEngine {
            params,
            sound_volume,
            step: BASE_SAMPLE_RATE as f32 / sample_rate.max(1) as f32,
            noise_seed,
            max_samples: MAX_SAMPLES,
            osc: Oscillator::new(),
            envelope: Envelope::new(),
            lowpass: LowPass::new(),
            highpass: HighPass::new(),
            phaser: Phaser::new(),
            rng: XorShiftStar::new(noise_seed),
            pink: PinkNoise::new(DEFAULT_RANGE, noise_seed),
            fperiod: 0.0,
            fmaxperiod: 0.0,
            fslide: 1.0,
            fdslide: 0.0,
            duty_slide: 0.0,
            arp_mod: 1.0,
            arp_time: 0.0,
            arp_limit: 0.0,
            vib_phase: 0.0,
            vib_speed: 0.0,
            vib_amp: 0.0,
            rep_time: 0.0,
            rep_limit: 0.0,
            playing: false,
            truncated: false,
        }
    }

    /// Lower the sample cap (never above [`MAX_SAMPLES`]).
    pub fn with_max_samples(mut self, cap: usize) -> Self {
        self.max_samples = cap.min(MAX_SAMPLES);
        self
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True when the last [`render`](Self::render) was cut off by the sample cap.
    pub fn was_truncated(&self) -> bool {
        self.truncated
    }

    /// Prepare for synthesis.
    ///
    /// A full reset (`restart == false`) rebuilds every piece of state from
    /// the parameters. A restart, used by the repeat timer, only rewinds
    /// pitch, slide, duty and arpeggio; phase, envelope, filters, phaser
    /// and noise banks carry on.
    pub fn reset(&mut self, restart: bool) {
        let p = self.params;

        self.fperiod = 100.0 / (p.base_freq as f64 * p.base_freq as f64 + 0.001);
        self.fmaxperiod = 100.0 / (p.freq_limit as f64 * p.freq_limit as f64 + 0.001);
        self.fslide = 1.0 - (p.freq_ramp as f64).powi(3) * 0.01;
        self.fdslide = -(p.freq_dramp as f64).powi(3) * 0.000001;
        self.osc.duty = 0.5 - p.duty * 0.5;
        self.duty_slide = -p.duty_ramp * 0.00005;
        self.arp_mod = if p.arp_mod >= 0.0 {
            1.0 - (p.arp_mod as f64).powi(2) * 0.9
        } else {
            1.0 + (p.arp_mod as f64).powi(2) * 10.0
        };
        self.arp_time = 0.0;
        self.arp_limit = if p.arp_speed == 1.0 {
            0.0
        } else {
            ((1.0 - p.arp_speed).powi(2) * 20000.0 + 32.0).trunc()
        };
        self.osc.set_period((self.fperiod as f32).trunc());

        if restart {
            return;
        }

        self.osc.waveform = p.waveform();
        self.rng.seed(self.noise_seed);
        self.pink.reseed(self.noise_seed);
        self.osc.reset(&mut self.rng, &mut self.pink);

        self.lowpass.configure(p.lpf_freq, p.lpf_ramp, p.lpf_resonance);
        self.highpass.configure(p.hpf_freq, p.hpf_ramp);

        self.vib_phase = 0.0;
        self.vib_speed = p.vib_speed.powi(2) * 0.01;
        self.vib_amp = p.vib_strength * 0.5;

        self.envelope.trigger(p.env_attack, p.env_sustain, p.env_decay, p.env_punch);
        self.phaser.configure(p.pha_offset, p.pha_ramp);

        self.rep_time = 0.0;
        self.rep_limit = if p.repeat_speed == 0.0 {
            0.0
        } else {
            ((1.0 - p.repeat_speed).powi(2) * 20000.0 + 32.0).trunc()
        };
        self.playing = true;
    }

    /// Fully reset and synthesize the whole sound into `out`.
    ///
    /// Returns the number of samples appended. Rendering stops when the
    /// envelope finishes, the pitch falls below the frequency limit, or
    /// the sample cap is reached.
    pub fn render(&mut self, out: &mut SampleBuffer) -> usize {
        self.reset(false);
        let mut produced = 0;
        while produced < self.max_samples {
            match self.next_sample() {
                Some(s) => {
                    out.push(s);
                    produced += 1;
                }
                None => break,
            }
        }
        // A sound whose envelope ends on the last allowed sample is complete.
        self.truncated = self.playing && !self.envelope.is_finished();
        self.playing = false;
        if self.truncated {
            log::warn!("Sound truncated at the {} sample cap", self.max_samples);
        }
        log::debug!("Synthesized {produced} samples (capped: {})", self.truncated);
        produced
    }

    /// Produce one output sample, or `None` once the sound has ended.
    pub fn next_sample(&mut self) -> Option<f32> {
        if !self.playing {
            return None;
        }
        let step = self.step;

        self.rep_time += step;
        if self.rep_limit != 0.0 && self.rep_time >= self.rep_limit {
            self.rep_time = 0.0;
            log::trace!("Repeat: restarting pitch");
            self.reset(true);
        }

        self.arp_time += step;
        if self.arp_limit != 0.0 && self.arp_time >= self.arp_limit {
            self.arp_limit = 0.0;
            self.fperiod *= self.arp_mod;
        }

        self.fslide += self.fdslide * step as f64;
        self.fperiod *= self.fslide;
        if self.fperiod > self.fmaxperiod {
            self.fperiod = self.fmaxperiod;
            if self.params.freq_limit > 0.0 {
                self.playing = false;
                return None;
            }
        }

        let mut rfperiod = self.fperiod as f32;
        if self.vib_amp > 0.0 {
            self.vib_phase += self.vib_speed * step;
            rfperiod = (self.fperiod * (1.0 + (self.vib_phase as f64).sin() * self.vib_amp as f64)) as f32;
        }
        self.osc.set_period(rfperiod.trunc().max(MIN_PERIOD));

        self.osc.duty = (self.osc.duty + self.duty_slide * step).clamp(0.0, 0.5);

        let Some(env_vol) = self.envelope.next_volume(step) else {
            self.playing = false;
            return None;
        };

        self.phaser.advance(step);
        self.highpass.advance_sweep(step);

        let mut acc = 0.0f32;
        for _ in 0..SUPERSAMPLE {
            let raw = self.osc.next_sample(step, &mut self.rng, &mut self.pink);
            let lp = self.lowpass.process(raw, step);
            let hp = self.highpass.process(lp);
            acc += self.phaser.process(hp, step) * env_vol;
        }
        let mut sample = acc / SUPERSAMPLE as f32;

        let bits = (self.params.decimate as i32).min(MAX_DECIMATE_BITS);
        if bits > 0 {
            let levels = (1u32 << bits) as f32;
            sample = (sample * levels).trunc() / levels;
        }

        let compress = self.params.compress;
        if compress != 0.0 && sample != 0.0 {
            sample = sample.abs().powf(compress).copysign(sample);
        }

        sample *= MASTER_VOLUME * 2.0 * self.sound_volume;
        Some(sample.clamp(-1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::Waveform;

    fn render(params: Parameters) -> Vec<f32> {
        let mut engine = SynthEngine::new(params, 0.5, BASE_SAMPLE_RATE, 0);
        let mut buf = SampleBuffer::new();
        let n = engine.render(&mut buf);
        assert_eq!(n, buf.len());
        buf.iter().collect()
    }

    #[test]
    fn default_length_follows_envelope() {
        let samples = render(Parameters::new());
        let mut env = Envelope::new();
        env.trigger(0.0, 0.3, 0.4, 0.0);
        assert_eq!(samples.len(), env.total_samples());
        assert!((24_900..25_100).contains(&samples.len()));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut p = Parameters::new();
        p.wave_type = Waveform::Noise.to_param();
        p.vib_strength = 0.3;
        p.vib_speed = 0.4;
        p.pha_offset = 0.2;
        p.lpf_freq = 0.6;
        p.lpf_resonance = 0.5;
        p.hpf_freq = 0.1;
        assert_eq!(render(p), render(p));
    }

    #[test]
    fn noise_seed_changes_noise() {
        let mut p = Parameters::new();
        p.wave_type = Waveform::Noise.to_param();
        let mut a = SynthEngine::new(p, 0.5, BASE_SAMPLE_RATE, 1);
        let mut b = SynthEngine::new(p, 0.5, BASE_SAMPLE_RATE, 2);
        let (mut ba, mut bb) = (SampleBuffer::new(), SampleBuffer::new());
        a.render(&mut ba);
        b.render(&mut bb);
        assert_eq!(ba.len(), bb.len());
        assert!(ba.iter().zip(bb.iter()).any(|(x, y)| x != y));
    }

    #[test]
    fn zero_length_sound_is_empty() {
        let mut p = Parameters::new();
        p.env_attack = 0.0;
        p.env_sustain = 0.0;
        p.env_decay = 0.0;
        assert!(render(p).is_empty());
    }

    #[test]
    fn attack_starts_silent() {
        let mut p = Parameters::new();
        p.env_attack = 0.2;
        let samples = render(p);
        assert_eq!(samples[0], 0.0);
    }

    #[test]
    fn output_is_clipped() {
        let mut p = Parameters::new();
        p.wave_type = Waveform::Tan.to_param();
        let mut engine = SynthEngine::new(p, 8.0, BASE_SAMPLE_RATE, 0);
        let mut buf = SampleBuffer::new();
        engine.render(&mut buf);
        assert!(buf.iter().all(|s| (-1.0..=1.0).contains(&s)));
        assert!(buf.iter().any(|s| s.abs() == 1.0), "Loud tan wave should hit the rails");
    }

    /// Decimation to 4 bits puts the pre-gain signal on a k/16 grid. The
    /// master gain (0.25 * 2 * 0.5 sound volume) is applied afterwards, so
    /// the output lands on multiples of 1/64.
    #[test]
    fn decimate_quantizes_output() {
        let mut p = Parameters::new();
        p.wave_type = Waveform::Sine.to_param();
        p.decimate = 4.0;
        for s in render(p) {
            let scaled = s * 64.0;
            assert!((scaled - scaled.round()).abs() < 1e-4, "{s} is not on the decimated grid");
        }
    }

    #[test]
    fn compress_preserves_sign() {
        let mut p = Parameters::new();
        p.wave_type = Waveform::Sawtooth.to_param();
        p.compress = 0.5;
        let samples = render(p);
        assert!(samples.iter().any(|&s| s < 0.0));
        assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn frequency_limit_stops_early() {
        let mut p = Parameters::new();
        p.freq_ramp = -0.5;
        p.freq_limit = 0.25;
        let full = Parameters::new();
        assert!(render(p).len() < render(full).len());
    }

    #[test]
    fn repeat_keeps_length_but_changes_audio() {
        let mut base = Parameters::new();
        base.freq_ramp = -0.3;
        let mut repeating = base;
        repeating.repeat_speed = 0.6;
        let a = render(base);
        let b = render(repeating);
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
    }

    #[test]
    fn arpeggio_changes_audio() {
        let mut p = Parameters::new();
        p.arp_mod = 0.5;
        p.arp_speed = 0.5;
        assert_ne!(render(p), render(Parameters::new()));
    }

    #[test]
    fn cap_terminates_render() {
        let mut p = Parameters::new();
        p.env_sustain = 1.0;
        let mut engine = SynthEngine::new(p, 0.5, BASE_SAMPLE_RATE, 0).with_max_samples(5000);
        let mut buf = SampleBuffer::new();
        assert_eq!(engine.render(&mut buf), 5000);
        assert!(!engine.is_playing());
        assert!(engine.was_truncated());
    }

    #[test]
    fn sound_ending_exactly_at_cap_is_complete() {
        let p = Parameters::new();
        let full = render(p).len();
        let mut engine = SynthEngine::new(p, 0.5, BASE_SAMPLE_RATE, 0).with_max_samples(full);
        let mut buf = SampleBuffer::new();
        assert_eq!(engine.render(&mut buf), full);
        assert!(!engine.was_truncated());

        let mut engine = SynthEngine::new(p, 0.5, BASE_SAMPLE_RATE, 0).with_max_samples(full - 1);
        assert_eq!(engine.render(&mut SampleBuffer::new()), full - 1);
        assert!(engine.was_truncated());
    }

    #[test]
    fn empty_attack_still_starts_silent() {
        let p = Parameters::new();
        assert_eq!(p.env_attack, 0.0);
        let samples = render(p);
        assert_eq!(samples[0], 0.0);
        assert!(samples[1..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn higher_output_rate_lengthens_sound() {
        let p = Parameters::new();
        let mut engine = SynthEngine::new(p, 0.5, 88_200, 0);
        let mut buf = SampleBuffer::new();
        engine.render(&mut buf);
        let base = render(p).len();
        assert!(buf.len() > base * 19 / 10, "Doubling the rate should roughly double the length");
    }

    #[test]
    fn invalid_waveform_is_silent() {
        let mut p = Parameters::new();
        p.wave_type = 42.0;
        let samples = render(p);
        assert!(!samples.is_empty());
        assert!(samples.iter().all(|&s| s == 0.0));
    }
}
