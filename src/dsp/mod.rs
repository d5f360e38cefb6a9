//! DSP engine — pure, deterministic piano-tone synthesis.
//!
//! Everything in this module is synchronous and side-effect free:
//! tuning math, the piano envelope, additive harmonic synthesis, and
//! WAV/data-URI encoding. The same code serves WebAudio hosts (via
//! WASM exports) and native playback (via the player).

pub mod envelope;
pub mod harmonics;
pub mod renderer;
pub mod tuning;
