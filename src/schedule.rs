//! Beat schedule resolver.
//!
//! Turns an analysis result into the list of pulse onsets the synthesizer
//! renders. Detected beat times are used directly; an empty list is
//! auto-generated from the BPM with per-beat timing and amplitude jitter
//! drawn from the injected RNG.

use rand::Rng;

use crate::config::{AnalysisResult, DEFAULT_AMPLITUDE, SynthesisConfig};

/// First auto-generated beat lands here, not at t = 0.
const START_OFFSET_SEC: f64 = 0.2;

/// One pulse onset in the schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatScheduleEntry {
    /// Onset in seconds, confined to [0, duration).
    pub time: f64,
    /// Peak amplitude scalar in (0, 1]. Degenerate (zero) input amplitudes
    /// are preserved so the integrity check downstream can catch them.
    pub amplitude: f64,
    /// Primary beat, or the softer trailing secondary of a double pulse.
    pub is_primary: bool,
}

/// Resolve the full schedule for one synthesis call.
///
/// Returns an empty schedule for non-positive bpm or duration; the engine
/// rejects such configs before calling here, but the resolver is safe
/// standalone. When the analysis carries its own double-pulse offset it
/// takes precedence over the config value.
pub fn resolve<R: Rng>(
    analysis: &AnalysisResult,
    config: &SynthesisConfig,
    rng: &mut R,
) -> Vec<BeatScheduleEntry> {
    if config.bpm <= 0.0 || config.duration_sec <= 0.0 {
        return Vec::new();
    }

    let mut schedule = if analysis.beat_times_sec.is_empty() {
        generate(config, rng)
    } else {
        from_detected(analysis, config.duration_sec)
    };

    if config.has_double_pulse {
        let offset_sec = match analysis.double_pulse_offset_ms {
            Some(ms) => ms as f64 / 1000.0,
            None => config.double_pulse_offset_ms as f64 / 1000.0,
        };
        expand_double_pulses(
            &mut schedule,
            offset_sec,
            config.tuning.secondary_gain,
            config.duration_sec,
        );
    }

    schedule.sort_by(|a, b| a.time.total_cmp(&b.time));
    schedule
}

/// Use detected beat times directly, dropping onsets outside the render
/// window and aligning amplitude scalars where provided.
fn from_detected(analysis: &AnalysisResult, duration_sec: f64) -> Vec<BeatScheduleEntry> {
    analysis
        .beat_times_sec
        .iter()
        .enumerate()
        .filter(|&(_, &t)| t >= 0.0 && t < duration_sec)
        .map(|(i, &t)| BeatScheduleEntry {
            time: t,
            amplitude: analysis
                .amplitude_scalars
                .get(i)
                .copied()
                .unwrap_or(DEFAULT_AMPLITUDE)
                .clamp(0.0, 1.0),
            is_primary: true,
        })
        .collect()
}

/// Periodic schedule from the BPM with independent uniform jitter per beat.
fn generate<R: Rng>(config: &SynthesisConfig, rng: &mut R) -> Vec<BeatScheduleEntry> {
    let interval = config.beat_interval_sec();
    let half_jitter_sec = config.timing_variability_ms / 2.0 / 1000.0;
    let half_variation = config.amplitude_variation / 2.0;

    let mut schedule = Vec::new();
    let mut t = START_OFFSET_SEC;
    while t < config.duration_sec {
        let jitter = if half_jitter_sec > 0.0 {
            rng.random_range(-half_jitter_sec..=half_jitter_sec)
        } else {
            0.0
        };
        let scale = if half_variation > 0.0 {
            1.0 + rng.random_range(-half_variation..=half_variation)
        } else {
            1.0
        };

        let time = (t + jitter).max(0.0);
        if time < config.duration_sec {
            schedule.push(BeatScheduleEntry {
                time,
                amplitude: (DEFAULT_AMPLITUDE * scale).clamp(0.0, 1.0),
                is_primary: true,
            });
        }
        t += interval;
    }
    schedule
}

/// Append a secondary entry after each primary, dropping any that would
/// land at or past the end of the buffer.
fn expand_double_pulses(
    schedule: &mut Vec<BeatScheduleEntry>,
    offset_sec: f64,
    secondary_gain: f64,
    duration_sec: f64,
) {
    let secondaries: Vec<BeatScheduleEntry> = schedule
        .iter()
        .filter(|e| e.is_primary)
        .filter_map(|e| {
            let time = e.time + offset_sec;
            if time < duration_sec {
                Some(BeatScheduleEntry {
                    time,
                    amplitude: e.amplitude * secondary_gain,
                    is_primary: false,
                })
            } else {
                None
            }
        })
        .collect();
    schedule.extend(secondaries);
}
