use std::fmt;

/// Errors surfaced by the synthesis engine.
///
/// Every variant carries a stage tag (`synthesis` or `encoding`) so callers
/// and logs can attribute failures without parsing the message. Integrity
/// failures (sub-audible output) are recovered internally via the fallback
/// profile and never appear here.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthError {
    /// No usable audio subsystem. Fatal to the requesting call, not retried.
    EnvironmentUnsupported { detail: String },
    /// Rejected configuration: non-positive bpm, duration, or sample rate.
    InvalidConfig { detail: String },
    /// Container encoding failed. Unreachable for a validated buffer; any
    /// occurrence is an invariant violation, not retried.
    Encoding { detail: String },
}

impl SynthError {
    /// Pipeline stage the error belongs to, for observability.
    pub fn stage(&self) -> &'static str {
        match self {
            SynthError::EnvironmentUnsupported { .. } => "synthesis",
            SynthError::InvalidConfig { .. } => "synthesis",
            SynthError::Encoding { .. } => "encoding",
        }
    }

    pub(crate) fn invalid_config(detail: impl Into<String>) -> Self {
        SynthError::InvalidConfig { detail: detail.into() }
    }
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::EnvironmentUnsupported { detail } => {
                write!(f, "[{}] audio subsystem unavailable: {detail}", self.stage())
            }
            SynthError::InvalidConfig { detail } => {
                write!(f, "[{}] invalid configuration: {detail}", self.stage())
            }
            SynthError::Encoding { detail } => {
                write!(f, "[{}] container encoding failed: {detail}", self.stage())
            }
        }
    }
}

impl std::error::Error for SynthError {}
