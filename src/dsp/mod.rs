//! DSP pipeline — Pure Rust heartbeat synthesis and processing.
//!
//! All DSP runs in Rust for deterministic, cross-platform audio output.
//! The same code powers both the browser path (via WASM) and native
//! offline rendering. Stages run in order: pulse synthesis + noise floor
//! into one shared buffer, then band-pass post-filter, limiter, and the
//! WAV container encoder.

pub mod engine;
pub mod envelope;
pub mod filter;
pub mod limiter;
pub mod noise;
pub mod oscillator;
pub mod pulse;
pub mod renderer;
