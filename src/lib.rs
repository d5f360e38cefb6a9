pub mod backend;
pub mod config;
pub mod dsp;
pub mod error;
pub mod player;

pub use crate::backend::{AudioSink, BackendKind, BackendSpec, MidiOut, PlaybackBackend};
pub use crate::config::SynthConfig;
pub use crate::dsp::harmonics::Synth;
pub use crate::dsp::renderer::AudioAsset;
pub use crate::error::SynthError;
pub use crate::player::Player;

use crate::dsp::renderer::encode_asset;
use crate::dsp::tuning::{clamp_pitch, clamp_velocity, midi_to_frequency, velocity_to_amplitude};
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the pianotone version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Render one note to a playable `data:audio/wav;base64,` URI.
///
/// Pitch and velocity are clamped to their valid ranges, matching the
/// playback layer's leniency policy for UI callers.
pub fn render_note_data_uri(
    config: &SynthConfig,
    pitch: i32,
    velocity: i32,
    duration_seconds: f64,
) -> Result<String, SynthError> {
    let pitch = clamp_pitch(pitch);
    let amplitude = velocity_to_amplitude(clamp_velocity(velocity));
    let frequency = midi_to_frequency(pitch, config.tuning_pitch);
    let synth = Synth::new(config.clone());
    let samples = synth.synthesize_note(frequency, duration_seconds, amplitude)?;
    let asset = encode_asset(&samples, config.sample_rate)?;
    Ok(asset.data_uri().to_string())
}

/// Render a chord to a playable `data:audio/wav;base64,` URI.
pub fn render_chord_data_uri(
    config: &SynthConfig,
    pitches: &[i32],
    velocity: i32,
    duration_seconds: f64,
) -> Result<String, SynthError> {
    let amplitude = velocity_to_amplitude(clamp_velocity(velocity));
    let frequencies: Vec<f64> = pitches
        .iter()
        .map(|&p| midi_to_frequency(clamp_pitch(p), config.tuning_pitch))
        .collect();
    let synth = Synth::new(config.clone());
    let samples = synth.synthesize_chord(&frequencies, duration_seconds, amplitude)?;
    let asset = encode_asset(&samples, config.sample_rate)?;
    Ok(asset.data_uri().to_string())
}

/// WASM-exposed: render one note with the default piano configuration.
#[wasm_bindgen]
pub fn note_data_uri(pitch: i32, velocity: i32, duration_seconds: f64) -> Result<String, JsValue> {
    render_note_data_uri(&SynthConfig::default(), pitch, velocity, duration_seconds)
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render a chord with the default piano configuration.
#[wasm_bindgen]
pub fn chord_data_uri(
    pitches: Vec<i32>,
    velocity: i32,
    duration_seconds: f64,
) -> Result<String, JsValue> {
    render_chord_data_uri(&SynthConfig::default(), &pitches, velocity, duration_seconds)
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: the default synthesis configuration as a JS object,
/// for hosts that want to tweak and pass it back.
#[wasm_bindgen]
pub fn default_config() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&SynthConfig::default())
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render one note with a host-supplied configuration.
#[wasm_bindgen]
pub fn note_data_uri_with_config(
    config: JsValue,
    pitch: i32,
    velocity: i32,
    duration_seconds: f64,
) -> Result<String, JsValue> {
    let config: SynthConfig =
        serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    render_note_data_uri(&config, pitch, velocity, duration_seconds)
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::renderer::DATA_URI_PREFIX;

    #[test]
    fn note_uri_has_wav_prefix() {
        let uri = render_note_data_uri(&SynthConfig::default(), 69, 100, 0.1).expect("render");
        assert!(uri.starts_with(DATA_URI_PREFIX));
    }

    #[test]
    fn chord_uri_has_wav_prefix() {
        let uri = render_chord_data_uri(&SynthConfig::default(), &[60, 64, 67], 100, 0.1)
            .expect("render");
        assert!(uri.starts_with(DATA_URI_PREFIX));
    }

    #[test]
    fn out_of_range_pitch_is_clamped() {
        // Must not fail — pitch 300 renders as pitch 127.
        let cfg = SynthConfig::default();
        let clamped = render_note_data_uri(&cfg, 300, 100, 0.05).expect("render");
        let top = render_note_data_uri(&cfg, 127, 100, 0.05).expect("render");
        assert_eq!(clamped, top);
    }
}
