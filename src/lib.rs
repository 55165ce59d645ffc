pub mod config;
pub mod context;
pub mod dsp;
pub mod error;
pub mod schedule;

pub use crate::config::{AnalysisResult, ProfileTuning, SynthesisConfig};
pub use crate::context::{AudioSystem, SystemState};
pub use crate::dsp::engine::{AudioMetadata, SynthesisEngine, SynthesizedAudio};
pub use crate::dsp::limiter::LimiterMode;
pub use crate::dsp::pulse::SynthesisProfile;
pub use crate::error::SynthError;
pub use crate::schedule::BeatScheduleEntry;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the dopplerbeat-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Synthesize a heartbeat recording from an analysis result.
///
/// Convenience entry that owns a default audio subsystem handle; callers
/// that manage the subsystem themselves use [`SynthesisEngine::with_system`].
pub fn synthesize(
    analysis: &AnalysisResult,
    config: &SynthesisConfig,
) -> Result<SynthesizedAudio, SynthError> {
    SynthesisEngine::new().synthesize(analysis, config)
}

fn config_from_js(config: JsValue) -> Result<SynthesisConfig, JsValue> {
    if config.is_null() || config.is_undefined() {
        Ok(SynthesisConfig::default())
    } else {
        serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("{e}")))
    }
}

/// WASM-exposed: synthesize and return the WAV container bytes, ready to be
/// wrapped in a Blob by the playback/download collaborator. `config` may be
/// null/undefined for defaults.
#[wasm_bindgen]
pub fn synthesize_heartbeat_wav(analysis: JsValue, config: JsValue) -> Result<Vec<u8>, JsValue> {
    let analysis: AnalysisResult =
        serde_wasm_bindgen::from_value(analysis).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let mut config = config_from_js(config)?;
    config.apply_analysis(&analysis);
    let audio = synthesize(&analysis, &config).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(audio.wav)
}

/// WASM-exposed: synthesize and return `{ wav, metadata }`.
#[wasm_bindgen]
pub fn synthesize_heartbeat(analysis: JsValue, config: JsValue) -> Result<JsValue, JsValue> {
    let analysis: AnalysisResult =
        serde_wasm_bindgen::from_value(analysis).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let mut config = config_from_js(config)?;
    config.apply_analysis(&analysis);
    let audio = synthesize(&analysis, &config).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    serde_wasm_bindgen::to_value(&audio).map_err(|e| JsValue::from_str(&format!("{e}")))
}
