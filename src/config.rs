//! Configuration and analysis-input types for the synthesis engine.
//!
//! `AnalysisResult` maps directly to the JSON object produced by the
//! vision-model analysis collaborator; `SynthesisConfig` is supplied by the
//! caller and is immutable for the lifetime of one synthesis call.

use serde::{Deserialize, Serialize};

use crate::dsp::limiter::LimiterMode;
use crate::dsp::pulse::SynthesisProfile;

/// Default per-beat amplitude scalar when the analysis supplies none.
pub const DEFAULT_AMPLITUDE: f64 = 0.8;

/// Default primary-to-secondary pulse offset in milliseconds.
pub const DEFAULT_DOUBLE_PULSE_OFFSET_MS: u32 = 60;

/// Beat-detection output consumed by the engine.
///
/// `beat_times_sec` must be ascending when present; an empty list asks the
/// resolver to auto-generate a schedule from `bpm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Estimated heart rate, plausible range 40-220.
    pub bpm: f64,
    /// Detection confidence [0, 1]. Carried through for the caller;
    /// does not alter synthesis.
    #[serde(default)]
    pub confidence: f64,
    /// Detected beat onsets in seconds, ascending, possibly empty.
    #[serde(default)]
    pub beat_times_sec: Vec<f64>,
    /// Offset of the softer secondary pulse. Absent means
    /// [`DEFAULT_DOUBLE_PULSE_OFFSET_MS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_pulse_offset_ms: Option<u32>,
    /// Per-beat amplitude scalars aligned to `beat_times_sec`. Empty or
    /// misaligned entries fall back to [`DEFAULT_AMPLITUDE`].
    #[serde(default)]
    pub amplitude_scalars: Vec<f64>,
}

impl AnalysisResult {
    /// A plain BPM-only result with no detected beat positions.
    pub fn from_bpm(bpm: f64) -> Self {
        AnalysisResult {
            bpm,
            confidence: 0.0,
            beat_times_sec: Vec::new(),
            double_pulse_offset_ms: None,
            amplitude_scalars: Vec::new(),
        }
    }

}

/// Tuning constants for the pulse renderers and post-filter.
///
/// The source material disagreed on several of these (85 Hz vs 200-250 Hz
/// fundamentals, 0.4 vs 0.6 secondary gain, -36 vs -42 dBFS floors), so
/// they are exposed as parameters. Defaults target the "realistic"
/// filtered-noise rendition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileTuning {
    /// Fundamental for the tonal profile and the filtered-noise low band.
    pub fundamental_hz: f64,
    /// Secondary pulse amplitude relative to its primary.
    pub secondary_gain: f64,
    /// Lower bound of the randomized oscillator band (filtered-noise).
    pub band_low_hz: f64,
    /// Upper bound of the randomized oscillator band (filtered-noise).
    pub band_high_hz: f64,
    /// Post-filter band lower edge.
    pub filter_low_hz: f64,
    /// Post-filter band upper edge.
    pub filter_high_hz: f64,
    /// Post-filter resonance.
    pub filter_q: f64,
}

impl Default for ProfileTuning {
    fn default() -> Self {
        ProfileTuning {
            fundamental_hz: 220.0,
            secondary_gain: 0.6,
            band_low_hz: 150.0,
            band_high_hz: 1200.0,
            filter_low_hz: 200.0,
            filter_high_hz: 1200.0,
            filter_q: 1.5,
        }
    }
}

/// Caller-supplied synthesis parameters, immutable per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynthesisConfig {
    /// Heart rate driving auto-generated schedules and noise breathing.
    pub bpm: f64,
    /// Output length in seconds. Typical calls stay at or below 10 s.
    pub duration_sec: f64,
    pub sample_rate_hz: u32,
    /// Render a softer secondary pulse after each primary.
    pub has_double_pulse: bool,
    pub double_pulse_offset_ms: u32,
    /// Full width of the uniform per-beat timing jitter.
    pub timing_variability_ms: f64,
    /// Full width of the multiplicative per-beat amplitude jitter.
    pub amplitude_variation: f64,
    /// Pink-noise floor level in dBFS, typically -36 to -42.
    pub background_level_db: f64,
    /// Modulate the floor 1.0 -> 1.3 -> 1.0 across each beat interval.
    pub noise_breathing: bool,
    pub profile: SynthesisProfile,
    pub limiter: LimiterMode,
    pub tuning: ProfileTuning,
    /// RNG seed. `None` seeds from process entropy; tests pass a fixed
    /// value to make jitter and noise reproducible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        SynthesisConfig {
            bpm: 140.0,
            duration_sec: 8.0,
            sample_rate_hz: 44_100,
            has_double_pulse: true,
            double_pulse_offset_ms: DEFAULT_DOUBLE_PULSE_OFFSET_MS,
            timing_variability_ms: 12.0,
            amplitude_variation: 0.15,
            background_level_db: -38.0,
            noise_breathing: true,
            profile: SynthesisProfile::FilteredNoise,
            limiter: LimiterMode::SoftCeiling,
            tuning: ProfileTuning::default(),
            seed: None,
        }
    }
}

impl SynthesisConfig {
    /// Fold analysis-supplied values into this config: the estimated BPM
    /// always wins, the double-pulse offset only when the analysis
    /// carries one.
    pub fn apply_analysis(&mut self, analysis: &AnalysisResult) {
        self.bpm = analysis.bpm;
        if let Some(offset) = analysis.double_pulse_offset_ms {
            self.double_pulse_offset_ms = offset;
        }
    }

    /// Config derived from an analysis result, keeping all other defaults.
    pub fn from_analysis(analysis: &AnalysisResult) -> Self {
        let mut config = SynthesisConfig::default();
        config.apply_analysis(analysis);
        config
    }

    /// Exact output buffer length in samples.
    pub fn sample_count(&self) -> usize {
        (self.duration_sec * self.sample_rate_hz as f64).round() as usize
    }

    /// Beat interval in seconds, `60 / bpm`.
    pub fn beat_interval_sec(&self) -> f64 {
        60.0 / self.bpm
    }
}
