pub mod batch;
pub mod config;
pub mod dsp;
pub mod error;
pub mod params;
pub mod preset;
pub mod sound;

pub use crate::batch::{BatchRenderer, JobHandle, RenderedSound, SoundRequest};
pub use crate::config::{RenderConfig, RenderMode};
pub use crate::dsp::oscillator::Waveform;
pub use crate::dsp::renderer::ExportFormat;
pub use crate::error::{ConfigError, LoadError, SfxrError};
pub use crate::params::{BlockFormat, PARAM_NAMES, ParameterBlock, Parameters};
pub use crate::preset::SoundKind;
pub use crate::sound::{Sound, SoundInfo, SoundQuickInfo};

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the sfxr-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: canonical parameter names in slot order.
#[wasm_bindgen]
pub fn parameter_names() -> Vec<String> {
    PARAM_NAMES.iter().map(|n| n.to_string()).collect()
}

/// Render a preset to 16-bit WAV bytes at 44100 Hz.
pub fn preset_wav(kind: &str, seed: u64) -> Result<Vec<u8>, SfxrError> {
    let kind = SoundKind::from_name(kind)?;
    let mut sound = Sound::default();
    sound.seed(seed);
    sound.create_preset(kind);
    sound.export_bytes(ExportFormat::WavePcm)
}

/// WASM-exposed: render a named preset (e.g. `"JUMP"`) to a WAV byte array.
#[wasm_bindgen]
pub fn render_preset_wav(kind: &str, seed: u64) -> Result<Vec<u8>, JsValue> {
    preset_wav(kind, seed).map_err(|e| JsValue::from_str(&format!("{e}")))
}

fn params_from_js(params: JsValue) -> Result<Parameters, JsValue> {
    serde_wasm_bindgen::from_value(params).map_err(|e| JsValue::from_str(&format!("{e}")))
}

fn sound_for(params: Parameters) -> Sound {
    let mut sound = Sound::default();
    sound.set_params(params);
    sound
}

/// WASM-exposed: render a parameter object to mono f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_parameters_samples(params: JsValue) -> Result<Vec<f32>, JsValue> {
    let mut sound = sound_for(params_from_js(params)?);
    Ok(sound.samples().collect())
}

/// WASM-exposed: render a parameter object to a WAV byte array.
#[wasm_bindgen]
pub fn render_parameters_wav(params: JsValue) -> Result<Vec<u8>, JsValue> {
    let mut sound = sound_for(params_from_js(params)?);
    sound
        .export_bytes(ExportFormat::WavePcm)
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}
