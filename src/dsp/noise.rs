//! Pink-noise floor generator.
//!
//! Emulates the ambient hiss of a Doppler probe: a 6-pole leaky-integrator
//! cascade (Paul Kellet's economy pinking filter) driven by uniform white
//! noise, scaled to a dBFS target, optionally modulated in sync with the
//! beat interval for a breathing texture.

use rand::Rng;

use crate::config::SynthesisConfig;

/// Breathing gain peaks here at 20 % of the beat interval.
const BREATH_PEAK_GAIN: f64 = 1.3;

/// Stateful pink-noise source.
///
/// Six accumulators, each a leaky integrator with a fixed decay, fed from
/// the same fresh uniform sample; their weighted sum approximates a 1/f
/// spectrum within a fraction of a dB over the audio band.
#[derive(Debug, Clone, Default)]
pub struct PinkNoise {
    state: [f64; 6],
}

impl PinkNoise {
    pub fn new() -> Self {
        PinkNoise::default()
    }

    /// Next pink sample from a fresh uniform white sample in [-1, 1].
    pub fn next_sample(&mut self, white: f64) -> f64 {
        let b = &mut self.state;
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.96900 * b[2] + white * 0.1538520;
        b[3] = 0.86650 * b[3] + white * 0.3104856;
        b[4] = 0.55000 * b[4] + white * 0.5329522;
        b[5] = -0.7616 * b[5] - white * 0.0168980;
        (b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + white * 0.5362) * 0.11
    }
}

/// Convert a dBFS level to a linear gain.
pub fn db_to_gain(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Heartbeat-synchronous gain for the noise floor at time `t`: ramps
/// 1.0 -> 1.3 over the first 20 % of each beat interval, then back down
/// over the remaining 80 %.
fn breathing_gain(t: f64, interval_sec: f64) -> f64 {
    if interval_sec <= 0.0 {
        return 1.0;
    }
    let phase = (t / interval_sec).fract();
    if phase < 0.2 {
        1.0 + (BREATH_PEAK_GAIN - 1.0) * (phase / 0.2)
    } else {
        BREATH_PEAK_GAIN - (BREATH_PEAK_GAIN - 1.0) * ((phase - 0.2) / 0.8)
    }
}

/// Accumulate the pink-noise floor into the shared buffer.
pub fn mix_background<R: Rng>(buffer: &mut [f64], config: &SynthesisConfig, rng: &mut R) {
    let gain = db_to_gain(config.background_level_db);
    let interval = config.beat_interval_sec();
    let sample_rate = config.sample_rate_hz as f64;
    let mut pink = PinkNoise::new();

    for (i, sample) in buffer.iter_mut().enumerate() {
        let white = rng.random_range(-1.0..=1.0);
        let mut value = pink.next_sample(white) * gain;
        if config.noise_breathing {
            value *= breathing_gain(i as f64 / sample_rate, interval);
        }
        *sample += value;
    }
}
