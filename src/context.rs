//! Audio subsystem handle.
//!
//! The engine does not talk to an output device itself (playback lives in
//! the host collaborator), but it still acquires a shared subsystem handle
//! before allocating buffers: lazily initialized on first use, explicitly
//! resumed when suspended, and reusable across calls. Modelling it as an
//! explicit resource object rather than hidden global state lets tests
//! substitute a closed or suspended system.

use crate::error::SynthError;

/// Lifecycle state of the audio subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    /// Created but never started.
    Uninitialized,
    Running,
    /// Started, then paused by the host; must be resumed before use.
    Suspended,
    /// Torn down. A closed system cannot be revived.
    Closed,
}

/// Shared audio-subsystem resource.
///
/// May be shared (read-mostly) across synthesis calls; each call owns its
/// sample buffer exclusively.
#[derive(Debug)]
pub struct AudioSystem {
    state: SystemState,
}

impl AudioSystem {
    pub fn new() -> Self {
        AudioSystem { state: SystemState::Uninitialized }
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    /// Bring the system to `Running`, initializing lazily or resuming as
    /// needed. Idempotent when already running. Fails on a closed system
    /// without corrupting state for subsequent calls.
    pub fn ensure_running(&mut self) -> Result<(), SynthError> {
        match self.state {
            SystemState::Running => Ok(()),
            SystemState::Uninitialized => {
                self.state = SystemState::Running;
                log::debug!("audio subsystem initialized");
                Ok(())
            }
            SystemState::Suspended => {
                self.resume();
                Ok(())
            }
            SystemState::Closed => Err(SynthError::EnvironmentUnsupported {
                detail: "audio subsystem has been torn down".to_string(),
            }),
        }
    }

    /// Host-driven pause. No effect unless running.
    pub fn suspend(&mut self) {
        if self.state == SystemState::Running {
            self.state = SystemState::Suspended;
        }
    }

    /// Explicit resume from `Suspended`.
    pub fn resume(&mut self) {
        if self.state == SystemState::Suspended {
            self.state = SystemState::Running;
            log::debug!("audio subsystem resumed");
        }
    }

    /// Release the subsystem. Terminal; later calls fail with
    /// `EnvironmentUnsupported`.
    pub fn teardown(&mut self) {
        self.state = SystemState::Closed;
    }
}

impl Default for AudioSystem {
    fn default() -> Self {
        AudioSystem::new()
    }
}
