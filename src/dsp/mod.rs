//! DSP — the sfxr synthesis pipeline.
//!
//! Everything here is deterministic given a parameter set and a noise
//! seed, so a sound renders identically on every platform and thread.

pub mod buffer;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod oscillator;
pub mod phaser;
pub mod pink;
pub mod renderer;
pub mod rng;
