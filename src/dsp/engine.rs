//! Synthesis engine — turns an analysis result into encoded audio.
//!
//! The pipeline is: validate config, acquire the audio subsystem, resolve
//! the beat schedule, accumulate the noise floor and pulse train into one
//! shared buffer, verify audibility (regenerating with the reliable
//! fallback voicing if the render is sub-audible), post-filter, limit, and
//! encode. Primary and fallback rendering are pure functions of the config
//! and schedule; no mutable state is shared between the two attempts.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::{AnalysisResult, SynthesisConfig};
use crate::context::AudioSystem;
use crate::error::SynthError;
use crate::schedule::{self, BeatScheduleEntry};

use super::filter::BandPass;
use super::limiter;
use super::noise;
use super::pulse::SynthesisProfile;
use super::renderer;

/// Peak magnitude below which a render is considered sub-audible.
const PEAK_FLOOR: f64 = 0.01;

/// RMS below which a render is considered sub-audible.
const RMS_FLOOR: f64 = 0.001;

/// Pulse amplitude used by the fallback render.
const FALLBACK_PULSE_AMPLITUDE: f64 = 0.5;

/// Noise level for the fallback render, quiet but present.
const FALLBACK_NOISE_LEVEL_DB: f64 = -48.0;

/// Fixed seed for the fallback noise bed; the terminal recovery path must
/// not depend on call-specific randomness.
const FALLBACK_SEED: u64 = 0x1790_BEA7;

/// Metadata returned alongside the encoded container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMetadata {
    pub duration_sec: f64,
    pub bpm: f64,
    /// Total container size: 44-byte header plus PCM data.
    pub byte_length: usize,
    pub has_double_pulse: bool,
    /// Number of primary beats rendered.
    pub beat_count: usize,
}

/// One synthesized result: the WAV container plus its metadata. The caller
/// owns the bytes until it releases them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedAudio {
    pub wav: Vec<u8>,
    pub metadata: AudioMetadata,
}

/// Peak and RMS over a whole buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferStats {
    pub peak: f64,
    pub rms: f64,
}

impl BufferStats {
    pub fn measure(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return BufferStats { peak: 0.0, rms: 0.0 };
        }
        let mut peak: f64 = 0.0;
        let mut sum_squares = 0.0;
        for &s in samples {
            peak = peak.max(s.abs());
            sum_squares += s * s;
        }
        BufferStats {
            peak,
            rms: (sum_squares / samples.len() as f64).sqrt(),
        }
    }

    /// Whether this render clears the audibility floor.
    pub fn is_audible(&self) -> bool {
        self.peak > PEAK_FLOOR && self.rms > RMS_FLOOR
    }
}

/// The heartbeat synthesis engine.
///
/// Owns the injected audio-subsystem handle; one engine serves many
/// synthesis calls, each with its own exclusively owned sample buffer.
#[derive(Debug)]
pub struct SynthesisEngine {
    system: AudioSystem,
}

impl SynthesisEngine {
    pub fn new() -> Self {
        SynthesisEngine::with_system(AudioSystem::new())
    }

    /// Engine with a caller-provided subsystem handle (or test double).
    pub fn with_system(system: AudioSystem) -> Self {
        SynthesisEngine { system }
    }

    pub fn system_mut(&mut self) -> &mut AudioSystem {
        &mut self.system
    }

    /// Run the full pipeline for one call.
    pub fn synthesize(
        &mut self,
        analysis: &AnalysisResult,
        config: &SynthesisConfig,
    ) -> Result<SynthesizedAudio, SynthError> {
        validate(config)?;
        self.system.ensure_running()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let schedule = schedule::resolve(analysis, config, &mut rng);
        log::debug!(
            "resolved schedule: {} entries ({} primary) for bpm {}",
            schedule.len(),
            schedule.iter().filter(|e| e.is_primary).count(),
            config.bpm
        );

        let mut buffer = render_mix(config, &schedule, &mut rng);
        let stats = BufferStats::measure(&buffer);

        let mut beat_count = schedule.iter().filter(|e| e.is_primary).count();
        if !stats.is_audible() {
            log::warn!(
                "[synthesis] render below audibility floor (peak {:.5}, rms {:.5}), \
                 regenerating with reliable voicing",
                stats.peak,
                stats.rms
            );
            let (fallback, bursts) = render_fallback(config);
            buffer = fallback;
            beat_count = bursts;
        }

        let tuning = &config.tuning;
        let mut post_filter = BandPass::new(
            tuning.filter_low_hz,
            tuning.filter_high_hz,
            tuning.filter_q,
            config.sample_rate_hz as f64,
        );
        post_filter.apply(&mut buffer);

        limiter::apply(&mut buffer, config.limiter);
        debug_assert!(buffer.iter().all(|s| s.abs() <= 1.0));

        let wav = renderer::render_wav(&buffer, config.sample_rate_hz);
        let expected = renderer::HEADER_BYTES + config.sample_count() * 2;
        if wav.len() != expected {
            // Unreachable for a validated buffer; fail loudly, never retry.
            return Err(SynthError::Encoding {
                detail: format!("container is {} bytes, expected {expected}", wav.len()),
            });
        }

        let byte_length = wav.len();
        Ok(SynthesizedAudio {
            wav,
            metadata: AudioMetadata {
                duration_sec: config.duration_sec,
                bpm: config.bpm,
                byte_length,
                has_double_pulse: config.has_double_pulse,
                beat_count,
            },
        })
    }
}

impl Default for SynthesisEngine {
    fn default() -> Self {
        SynthesisEngine::new()
    }
}

fn validate(config: &SynthesisConfig) -> Result<(), SynthError> {
    if !config.bpm.is_finite() || config.bpm <= 0.0 {
        return Err(SynthError::invalid_config(format!(
            "bpm must be positive, got {}",
            config.bpm
        )));
    }
    if !config.duration_sec.is_finite() || config.duration_sec <= 0.0 {
        return Err(SynthError::invalid_config(format!(
            "duration must be positive, got {} s",
            config.duration_sec
        )));
    }
    if config.sample_rate_hz == 0 {
        return Err(SynthError::invalid_config("sample rate must be positive"));
    }
    let tuning = &config.tuning;
    if !(tuning.band_low_hz > 0.0) || !(tuning.band_high_hz > tuning.band_low_hz) {
        return Err(SynthError::invalid_config(format!(
            "oscillator band must satisfy 0 < low < high, got {}..{} Hz",
            tuning.band_low_hz, tuning.band_high_hz
        )));
    }
    if !(tuning.filter_low_hz > 0.0)
        || !(tuning.filter_high_hz > tuning.filter_low_hz)
        || !(tuning.filter_q > 0.0)
    {
        return Err(SynthError::invalid_config(format!(
            "post-filter band must satisfy 0 < low < high with positive Q, got {}..{} Hz at Q {}",
            tuning.filter_low_hz, tuning.filter_high_hz, tuning.filter_q
        )));
    }
    Ok(())
}

/// Accumulate noise floor and pulse train into a fresh buffer. Pure in
/// (config, schedule, rng).
fn render_mix(
    config: &SynthesisConfig,
    schedule: &[BeatScheduleEntry],
    rng: &mut StdRng,
) -> Vec<f64> {
    let mut buffer = vec![0.0; config.sample_count()];
    noise::mix_background(&mut buffer, config, rng);

    let sample_rate = config.sample_rate_hz as f64;
    for entry in schedule {
        config.profile.render(
            &mut buffer,
            sample_rate,
            entry.time,
            entry.amplitude,
            entry.is_primary,
            &config.tuning,
            rng,
        );
    }
    buffer
}

/// Minimal guaranteed-audible render: a quiet pink-noise bed plus fixed
/// tone bursts at the beat interval. The terminal recovery strategy; it
/// cannot fail. Returns the buffer and the burst count.
fn render_fallback(config: &SynthesisConfig) -> (Vec<f64>, usize) {
    let mut buffer = vec![0.0; config.sample_count()];

    let noise_config = SynthesisConfig {
        background_level_db: FALLBACK_NOISE_LEVEL_DB,
        noise_breathing: false,
        ..config.clone()
    };
    let mut rng = StdRng::seed_from_u64(FALLBACK_SEED);
    noise::mix_background(&mut buffer, &noise_config, &mut rng);

    let sample_rate = config.sample_rate_hz as f64;
    let interval = config.beat_interval_sec();
    let mut bursts = 0;
    let mut t = 0.2;
    while t < config.duration_sec {
        SynthesisProfile::Reliable.render(
            &mut buffer,
            sample_rate,
            t,
            FALLBACK_PULSE_AMPLITUDE,
            true,
            &config.tuning,
            &mut rng,
        );
        bursts += 1;
        t += interval;
    }
    (buffer, bursts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scenario_a_config() -> SynthesisConfig {
        SynthesisConfig {
            bpm: 140.0,
            duration_sec: 8.0,
            sample_rate_hz: 48_000,
            timing_variability_ms: 0.0,
            amplitude_variation: 0.0,
            seed: Some(1234),
            ..SynthesisConfig::default()
        }
    }

    fn decode_samples(wav: &[u8]) -> Vec<f64> {
        let mut reader = hound::WavReader::new(Cursor::new(wav.to_vec())).expect("valid wav");
        reader
            .samples::<i16>()
            .map(|s| s.unwrap() as f64 / 32767.0)
            .collect()
    }

    #[test]
    fn scenario_a_byte_length_and_beats() {
        let analysis = AnalysisResult {
            double_pulse_offset_ms: Some(55),
            ..AnalysisResult::from_bpm(140.0)
        };
        let mut engine = SynthesisEngine::new();
        let audio = engine.synthesize(&analysis, &scenario_a_config()).unwrap();

        assert_eq!(audio.metadata.byte_length, 768_044);
        assert_eq!(audio.wav.len(), 768_044);
        assert_eq!(audio.metadata.beat_count, 19);
        assert!(audio.metadata.has_double_pulse);
    }

    #[test]
    fn scenario_b_beat_count() {
        let mut config = scenario_a_config();
        config.bpm = 110.0;
        let mut engine = SynthesisEngine::new();
        let audio = engine
            .synthesize(&AnalysisResult::from_bpm(110.0), &config)
            .unwrap();
        assert_eq!(audio.metadata.beat_count, 15);
    }

    #[test]
    fn auto_generated_schedule_matches_detected_density() {
        // Scenario C: an empty beat list auto-generates Scenario A's count.
        let mut engine = SynthesisEngine::new();
        let auto = engine
            .synthesize(&AnalysisResult::from_bpm(140.0), &scenario_a_config())
            .unwrap();
        assert_eq!(auto.metadata.beat_count, 19);
    }

    #[test]
    fn byte_length_matches_formula_across_rates() {
        let mut engine = SynthesisEngine::new();
        for (rate, duration) in [(22_050u32, 1.0f64), (44_100, 2.5), (48_000, 4.0)] {
            let config = SynthesisConfig {
                sample_rate_hz: rate,
                duration_sec: duration,
                seed: Some(9),
                ..SynthesisConfig::default()
            };
            let audio = engine
                .synthesize(&AnalysisResult::from_bpm(140.0), &config)
                .unwrap();
            let expected = 44 + (rate as f64 * duration).round() as usize * 2;
            assert_eq!(audio.metadata.byte_length, expected, "rate {rate}, {duration} s");
        }
    }

    #[test]
    fn samples_respect_limiter_invariant_across_random_configs() {
        let mut engine = SynthesisEngine::new();
        for seed in 0..8u64 {
            let config = SynthesisConfig {
                bpm: 60.0 + (seed as f64) * 20.0,
                duration_sec: 1.0 + (seed as f64) * 0.5,
                sample_rate_hz: if seed % 2 == 0 { 44_100 } else { 48_000 },
                limiter: if seed % 2 == 0 {
                    crate::dsp::limiter::LimiterMode::SoftCeiling
                } else {
                    crate::dsp::limiter::LimiterMode::HardRenormalize
                },
                seed: Some(seed),
                ..SynthesisConfig::default()
            };
            let audio = engine
                .synthesize(&AnalysisResult::from_bpm(config.bpm), &config)
                .unwrap();
            for s in decode_samples(&audio.wav) {
                assert!(s.abs() <= 1.0, "sample {s} violates limiter invariant (seed {seed})");
            }
        }
    }

    #[test]
    fn fallback_recovers_silent_schedule() {
        // Every detected beat forced silent, background floor far below the
        // integrity thresholds: the reliable voicing must take over.
        let beat_times: Vec<f64> = (0..19).map(|i| 0.2 + i as f64 * (60.0 / 140.0)).collect();
        let analysis = AnalysisResult {
            beat_times_sec: beat_times.clone(),
            amplitude_scalars: vec![0.0; beat_times.len()],
            ..AnalysisResult::from_bpm(140.0)
        };
        let config = SynthesisConfig {
            background_level_db: -90.0,
            ..scenario_a_config()
        };

        let mut engine = SynthesisEngine::new();
        let audio = engine.synthesize(&analysis, &config).unwrap();
        let peak = decode_samples(&audio.wav)
            .iter()
            .fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(peak > 0.01, "fallback output must clear the audibility floor, got {peak}");
        assert_eq!(audio.metadata.byte_length, 768_044);
    }

    #[test]
    fn normal_render_is_audible_without_fallback() {
        let mut engine = SynthesisEngine::new();
        let audio = engine
            .synthesize(&AnalysisResult::from_bpm(140.0), &scenario_a_config())
            .unwrap();
        let stats = BufferStats::measure(&decode_samples(&audio.wav));
        assert!(stats.peak > PEAK_FLOOR, "peak {} too low", stats.peak);
        assert!(stats.rms > RMS_FLOOR, "rms {} too low", stats.rms);
    }

    #[test]
    fn identical_seed_is_byte_reproducible() {
        let analysis = AnalysisResult::from_bpm(150.0);
        let config = SynthesisConfig {
            bpm: 150.0,
            duration_sec: 2.0,
            seed: Some(77),
            ..SynthesisConfig::default()
        };
        let mut engine = SynthesisEngine::new();
        let first = engine.synthesize(&analysis, &config).unwrap();
        let second = engine.synthesize(&analysis, &config).unwrap();
        assert_eq!(first.wav, second.wav);
    }

    #[test]
    fn invalid_configs_rejected_up_front() {
        let mut engine = SynthesisEngine::new();
        let analysis = AnalysisResult::from_bpm(140.0);

        for config in [
            SynthesisConfig { bpm: 0.0, ..SynthesisConfig::default() },
            SynthesisConfig { bpm: -10.0, ..SynthesisConfig::default() },
            SynthesisConfig { duration_sec: 0.0, ..SynthesisConfig::default() },
            SynthesisConfig { duration_sec: -1.0, ..SynthesisConfig::default() },
            SynthesisConfig { sample_rate_hz: 0, ..SynthesisConfig::default() },
        ] {
            let err = engine.synthesize(&analysis, &config).unwrap_err();
            assert!(matches!(err, SynthError::InvalidConfig { .. }), "got {err}");
            assert_eq!(err.stage(), "synthesis");
        }
    }

    #[test]
    fn degenerate_tuning_rejected_up_front() {
        use crate::config::ProfileTuning;

        let mut engine = SynthesisEngine::new();
        let analysis = AnalysisResult::from_bpm(140.0);

        // Tuning arrives from the collaborator unchecked; inverted or
        // zero-width bands must fail cleanly, never panic.
        for tuning in [
            ProfileTuning { band_high_hz: 150.0, band_low_hz: 150.0, ..ProfileTuning::default() },
            ProfileTuning { band_low_hz: 1200.0, band_high_hz: 150.0, ..ProfileTuning::default() },
            ProfileTuning { band_low_hz: -10.0, ..ProfileTuning::default() },
            ProfileTuning { filter_high_hz: 100.0, ..ProfileTuning::default() },
            ProfileTuning { filter_q: 0.0, ..ProfileTuning::default() },
        ] {
            let config = SynthesisConfig { tuning, ..SynthesisConfig::default() };
            let err = engine.synthesize(&analysis, &config).unwrap_err();
            assert!(matches!(err, SynthError::InvalidConfig { .. }), "got {err}");
        }
    }

    #[test]
    fn narrow_band_tuning_synthesizes_end_to_end() {
        use crate::config::ProfileTuning;

        let config = SynthesisConfig {
            duration_sec: 1.0,
            seed: Some(6),
            tuning: ProfileTuning {
                band_low_hz: 150.0,
                band_high_hz: 200.0,
                ..ProfileTuning::default()
            },
            ..SynthesisConfig::default()
        };
        let mut engine = SynthesisEngine::new();
        let audio = engine
            .synthesize(&AnalysisResult::from_bpm(140.0), &config)
            .unwrap();
        assert!(audio.metadata.byte_length > 44);
    }

    #[test]
    fn closed_system_is_fatal_but_not_corrupting() {
        let mut system = AudioSystem::new();
        system.teardown();
        let mut engine = SynthesisEngine::with_system(system);
        let analysis = AnalysisResult::from_bpm(140.0);
        let config = SynthesisConfig { seed: Some(1), ..SynthesisConfig::default() };

        let err = engine.synthesize(&analysis, &config).unwrap_err();
        assert!(matches!(err, SynthError::EnvironmentUnsupported { .. }));
        // The failure must not corrupt state: the next call fails the same way.
        let err = engine.synthesize(&analysis, &config).unwrap_err();
        assert!(matches!(err, SynthError::EnvironmentUnsupported { .. }));
    }

    #[test]
    fn suspended_system_is_resumed_before_rendering() {
        let mut system = AudioSystem::new();
        system.ensure_running().unwrap();
        system.suspend();
        let mut engine = SynthesisEngine::with_system(system);

        let config = SynthesisConfig {
            duration_sec: 0.5,
            seed: Some(4),
            ..SynthesisConfig::default()
        };
        let audio = engine
            .synthesize(&AnalysisResult::from_bpm(120.0), &config)
            .unwrap();
        assert!(audio.metadata.byte_length > 44);
    }

    #[test]
    fn double_pulse_flag_reflected_in_metadata() {
        let mut with_double = scenario_a_config();
        with_double.timing_variability_ms = 0.0;
        let mut without = with_double.clone();
        without.has_double_pulse = false;

        let mut engine = SynthesisEngine::new();
        let analysis = AnalysisResult::from_bpm(140.0);
        let a = engine.synthesize(&analysis, &with_double).unwrap();
        let b = engine.synthesize(&analysis, &without).unwrap();

        // Primary counts match; only the secondaries differ.
        assert_eq!(a.metadata.beat_count, b.metadata.beat_count);
        assert!(a.metadata.has_double_pulse);
        assert!(!b.metadata.has_double_pulse);
    }

    #[test]
    fn buffer_stats_on_known_signal() {
        let stats = BufferStats::measure(&[0.0, 0.5, -0.5, 0.0]);
        assert_eq!(stats.peak, 0.5);
        assert!((stats.rms - (0.125_f64).sqrt()).abs() < 1e-12);
        assert!(!BufferStats::measure(&[]).is_audible());
    }
}
