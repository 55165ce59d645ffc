//! Peak protection ahead of the container encoder.

use serde::{Deserialize, Serialize};

/// Soft-ceiling clip level; leaves headroom below full scale.
pub const SOFT_CEILING: f64 = 0.95;

/// Which clip-protection guarantee the pipeline enforces. In either mode a
/// post-limiter magnitude above 1.0 is a contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimiterMode {
    /// Hard-clip anything beyond +/-0.95 before encoding. The default.
    SoftCeiling,
    /// Clamp to [-1, 1] at encode time only.
    HardRenormalize,
}

/// Apply the selected guarantee in place.
pub fn apply(samples: &mut [f64], mode: LimiterMode) {
    let ceiling = match mode {
        LimiterMode::SoftCeiling => SOFT_CEILING,
        LimiterMode::HardRenormalize => 1.0,
    };
    for sample in samples.iter_mut() {
        *sample = sample.clamp(-ceiling, ceiling);
    }
}
