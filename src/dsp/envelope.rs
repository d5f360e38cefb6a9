//! Piano amplitude envelope.
//!
//! Unlike a gated ADSR, this envelope is a pure function of elapsed
//! time and total note duration — it models a struck string that decays
//! on its own while "held", then fades quickly over the final release
//! window. Being stateless, the same curve can be evaluated for any
//! sample index during offline rendering.

use serde::{Deserialize, Serialize};

/// Time-domain amplitude curve for a struck piano string.
///
/// Phases, measured from note start:
/// - Attack: linear ramp 0 → 1 over `attack` seconds.
/// - Decay: exponential fall from 1 toward `sustain` over `decay` seconds.
/// - Sustain: `sustain` scaled by a slow natural decay (string energy loss).
/// - Release: the final `release` seconds before the note's total
///   duration, fading the held level toward silence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PianoEnvelope {
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Sustain level [0, 1].
    pub sustain: f64,
    /// Release time in seconds.
    pub release: f64,
    /// Exponential rate constant over the decay window.
    pub decay_rate: f64,
    /// Natural decay rate while held, per second.
    pub sustain_decay_rate: f64,
    /// Exponential rate constant over the release window.
    pub release_rate: f64,
}

impl Default for PianoEnvelope {
    fn default() -> Self {
        PianoEnvelope {
            attack: 0.003,
            decay: 0.4,
            sustain: 0.5,
            release: 2.0,
            decay_rate: 3.0,
            sustain_decay_rate: 0.3,
            release_rate: 8.0,
        }
    }
}

impl PianoEnvelope {
    /// Amplitude multiplier at `t` seconds into a note of `total` seconds.
    ///
    /// Phase boundaries are computed positionally from elapsed time and
    /// are not clamped to fit short totals; for notes shorter than
    /// attack + decay + release the sustain window collapses and the
    /// curve can step at the phase hand-offs. Callers that need smooth
    /// short notes should shorten `release` instead.
    pub fn amplitude_at(&self, t: f64, total: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        if t < self.attack {
            return t / self.attack;
        }
        let decay_end = self.attack + self.decay;
        if t < decay_end {
            let x = (t - self.attack) / self.decay;
            return self.sustain + (1.0 - self.sustain) * (-self.decay_rate * x).exp();
        }
        let release_start = total - self.release;
        if t < release_start {
            return self.held_level(t);
        }
        let held = self.held_level(release_start);
        let x = (t - release_start) / self.release;
        held * (-self.release_rate * x).exp()
    }

    /// Sustain level after natural string-energy loss, `t` seconds in.
    fn held_level(&self, t: f64) -> f64 {
        let held_for = t - (self.attack + self.decay);
        self.sustain * (-self.sustain_decay_rate * held_for).exp()
    }
}
