//! Pulse renderers — the synthesis profiles behind one render contract.
//!
//! Every profile renders a single heartbeat pulse additively into the
//! shared buffer at a given onset; overlapping pulses sum rather than
//! clamp. `Tonal` and `FilteredNoise` are the audible voicings,
//! `Reliable` is the guaranteed-audible fallback voicing used when the
//! integrity check rejects a render.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ProfileTuning;

use super::envelope::PulseEnvelope;
use super::oscillator::Oscillator;

/// Fallback tone frequency, well inside the post-filter band so the
/// terminal recovery path cannot be filtered below audibility.
pub const RELIABLE_TONE_HZ: f64 = 320.0;

/// How a pulse is voiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SynthesisProfile {
    /// Fundamental plus harmonics at integer multiples.
    Tonal,
    /// Randomized band-limited oscillators plus broadband noise, the
    /// "whoosh" texture of a real Doppler probe. The default.
    FilteredNoise,
    /// Fixed-frequency tone burst with a fixed envelope; no randomness,
    /// unconditionally audible.
    Reliable,
}

impl SynthesisProfile {
    /// Render one pulse into `buffer` starting at `time` seconds.
    ///
    /// The amplitude scalar is the pulse peak before post-filtering;
    /// primaries and secondaries differ only in envelope shape (and, for
    /// `FilteredNoise`, in how much broadband noise is blended in).
    pub fn render<R: Rng>(
        &self,
        buffer: &mut [f64],
        sample_rate: f64,
        time: f64,
        amplitude: f64,
        is_primary: bool,
        tuning: &ProfileTuning,
        rng: &mut R,
    ) {
        let start = (time * sample_rate).round() as usize;
        if start >= buffer.len() || amplitude <= 0.0 {
            return;
        }

        match self {
            SynthesisProfile::Tonal => {
                render_tonal(buffer, start, sample_rate, amplitude, is_primary, tuning)
            }
            SynthesisProfile::FilteredNoise => render_filtered_noise(
                buffer,
                start,
                sample_rate,
                amplitude,
                is_primary,
                tuning,
                rng,
            ),
            SynthesisProfile::Reliable => {
                render_reliable(buffer, start, sample_rate, amplitude)
            }
        }
    }
}

fn envelope_for(sample_rate: f64, is_primary: bool) -> PulseEnvelope {
    if is_primary {
        PulseEnvelope::primary(sample_rate)
    } else {
        PulseEnvelope::secondary(sample_rate)
    }
}

/// Fundamental sine plus three harmonics, weights falling off as 1/k.
fn render_tonal(
    buffer: &mut [f64],
    start: usize,
    sample_rate: f64,
    amplitude: f64,
    is_primary: bool,
    tuning: &ProfileTuning,
) {
    let mut partials: Vec<(Oscillator, f64)> = (1..=4)
        .map(|k| {
            (
                Oscillator::new(tuning.fundamental_hz * k as f64, sample_rate),
                1.0 / k as f64,
            )
        })
        .collect();
    let weight_sum: f64 = partials.iter().map(|(_, w)| w).sum();

    let mut env = envelope_for(sample_rate, is_primary);
    for sample in buffer[start..].iter_mut() {
        if env.is_finished() {
            break;
        }
        let level = env.next_sample();
        let mut mix = 0.0;
        for (osc, weight) in partials.iter_mut() {
            mix += osc.next_sample() * *weight;
        }
        *sample += amplitude * level * mix / weight_sum;
    }
}

/// Three band-limited oscillators with randomized centers (weighted toward
/// the 150-300 Hz region) plus a broadband noise term.
fn render_filtered_noise<R: Rng>(
    buffer: &mut [f64],
    start: usize,
    sample_rate: f64,
    amplitude: f64,
    is_primary: bool,
    tuning: &ProfileTuning,
    rng: &mut R,
) {
    let low = tuning.band_low_hz;
    let span = (tuning.band_high_hz - low).max(0.0);
    // Sub-bands are fractions of the configured range, so any ordered band
    // stays valid; the heaviest one sits at the bottom (the emphasis
    // region, 150-300 Hz at default tuning).
    let bands = [
        (low, low + 0.15 * span),
        (low + 0.10 * span, low + 0.50 * span),
        (low + 0.35 * span, low + span),
    ];
    let weights = [0.55, 0.30, 0.15];

    let mut oscillators: Vec<(Oscillator, f64)> = bands
        .iter()
        .zip(weights)
        .map(|(&(lo, hi), weight)| {
            (Oscillator::new(rng.random_range(lo..=hi), sample_rate), weight)
        })
        .collect();

    // Secondaries are tighter thumps; less hiss on top.
    let noise_weight = if is_primary { 0.35 } else { 0.2 };

    let mut env = envelope_for(sample_rate, is_primary);
    for sample in buffer[start..].iter_mut() {
        if env.is_finished() {
            break;
        }
        let level = env.next_sample();
        let mut mix = 0.0;
        for (osc, weight) in oscillators.iter_mut() {
            mix += osc.next_sample() * *weight;
        }
        mix += rng.random_range(-1.0..=1.0) * noise_weight;
        *sample += amplitude * level * mix;
    }
}

/// Fixed tone burst with the primary envelope shape.
fn render_reliable(buffer: &mut [f64], start: usize, sample_rate: f64, amplitude: f64) {
    let mut osc = Oscillator::new(RELIABLE_TONE_HZ, sample_rate);
    let mut env = PulseEnvelope::primary(sample_rate);
    for sample in buffer[start..].iter_mut() {
        if env.is_finished() {
            break;
        }
        *sample += amplitude * env.next_sample() * osc.next_sample();
    }
}
