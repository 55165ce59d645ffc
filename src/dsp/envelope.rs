//! Two-phase pulse envelope: linear attack, exponential decay.

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Attack,
    Decay,
    Done,
}

/// Exponential decay rate per decay constant; e^-6 leaves ~0.25 % of peak
/// at the nominal decay time, so a primary pulse is inaudible by ~100 ms.
const DECAY_RATE: f64 = 6.0;

/// The decay phase runs this many decay constants before the envelope
/// reports finished (residual ~1e-4).
const DECAY_TAIL: f64 = 1.5;

/// Percussive envelope for a single Doppler pulse.
///
/// Unlike a gated ADSR there is no sustain: the envelope fires once and
/// runs to completion.
#[derive(Debug, Clone)]
pub struct PulseEnvelope {
    stage: Stage,
    level: f64,
    attack_samples: usize,
    decay_samples: usize,
    /// Samples per decay constant, for the exponential curve.
    decay_rate_samples: f64,
    counter: usize,
}

impl PulseEnvelope {
    /// Envelope with the given attack/decay times in seconds.
    pub fn new(attack_sec: f64, decay_sec: f64, sample_rate: f64) -> Self {
        PulseEnvelope {
            stage: Stage::Attack,
            level: 0.0,
            attack_samples: (attack_sec * sample_rate) as usize,
            decay_samples: (decay_sec * DECAY_TAIL * sample_rate) as usize,
            decay_rate_samples: decay_sec * sample_rate,
            counter: 0,
        }
    }

    /// Shape for a primary heartbeat pulse: 8 ms attack, 80 ms decay.
    pub fn primary(sample_rate: f64) -> Self {
        PulseEnvelope::new(0.008, 0.080, sample_rate)
    }

    /// Shape for the softer secondary pulse: 6 ms attack, 60 ms decay.
    pub fn secondary(sample_rate: f64) -> Self {
        PulseEnvelope::new(0.006, 0.060, sample_rate)
    }

    /// Generate the next envelope sample in [0, 1].
    pub fn next_sample(&mut self) -> f64 {
        match self.stage {
            Stage::Attack => {
                if self.attack_samples == 0 {
                    self.level = 1.0;
                    self.enter_decay();
                } else {
                    self.level = self.counter as f64 / self.attack_samples as f64;
                    self.counter += 1;
                    if self.counter >= self.attack_samples {
                        self.level = 1.0;
                        self.enter_decay();
                    }
                }
            }
            Stage::Decay => {
                if self.decay_samples == 0 || self.decay_rate_samples <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Done;
                } else {
                    let t = self.counter as f64 / self.decay_rate_samples;
                    self.level = (-DECAY_RATE * t).exp();
                    self.counter += 1;
                    if self.counter >= self.decay_samples {
                        self.level = 0.0;
                        self.stage = Stage::Done;
                    }
                }
            }
            Stage::Done => {
                self.level = 0.0;
            }
        }
        self.level
    }

    /// True once the decay tail has fully played out.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Total pulse length in samples.
    pub fn len_samples(&self) -> usize {
        self.attack_samples + self.decay_samples
    }

    fn enter_decay(&mut self) {
        self.stage = Stage::Decay;
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_peaks_at_one() {
        let mut env = PulseEnvelope::primary(48_000.0);
        let mut max_level: f64 = 0.0;
        for _ in 0..1000 {
            max_level = max_level.max(env.next_sample());
        }
        assert!(
            (max_level - 1.0).abs() < 0.01,
            "attack should reach ~1.0, got {max_level}"
        );
    }

    #[test]
    fn primary_inaudible_by_100ms() {
        let sample_rate = 48_000.0;
        let mut env = PulseEnvelope::primary(sample_rate);
        let mut level = 0.0;
        for _ in 0..(0.1 * sample_rate) as usize {
            level = env.next_sample();
        }
        assert!(level < 0.01, "primary pulse should be inaudible by 100 ms, got {level}");
    }

    #[test]
    fn runs_to_completion() {
        let mut env = PulseEnvelope::secondary(48_000.0);
        for _ in 0..env.len_samples() + 1 {
            env.next_sample();
        }
        assert!(env.is_finished());
        assert_eq!(env.next_sample(), 0.0);
    }

    #[test]
    fn output_stays_in_unit_range() {
        let mut env = PulseEnvelope::new(0.008, 0.08, 44_100.0);
        for _ in 0..10_000 {
            let s = env.next_sample();
            assert!((0.0..=1.0).contains(&s), "envelope out of range: {s}");
        }
    }

    #[test]
    fn zero_attack_jumps_to_decay() {
        let mut env = PulseEnvelope::new(0.0, 0.05, 48_000.0);
        let first = env.next_sample();
        assert!((first - 1.0).abs() < 1e-12, "zero attack should start at peak");
    }
}
