//! Synthesis configuration.
//!
//! Everything that shapes the rendered tone — sample rate, tuning,
//! harmonic weight tables, envelope — is carried by an explicit
//! [`SynthConfig`] handed to each engine instance. There is no global
//! synthesizer state, so independent instances (and tests) can coexist.

use serde::{Deserialize, Serialize};

use crate::dsp::envelope::PianoEnvelope;
use crate::dsp::tuning::CONCERT_A4_HZ;

/// Default output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Harmonic weight table for single notes: (multiple-of-fundamental,
/// relative amplitude). The 7th harmonic is skipped on purpose — it is
/// weak in piano spectra.
pub const NOTE_HARMONICS: [(f64, f64); 7] = [
    (1.0, 1.0),
    (2.0, 0.7),
    (3.0, 0.5),
    (4.0, 0.4),
    (5.0, 0.3),
    (6.0, 0.2),
    (8.0, 0.15),
];

/// Harmonic weight table for chords. Chords use only harmonics 1–6;
/// the 8th partial of each chord tone would clutter the combined
/// spectrum.
pub const CHORD_HARMONICS: [(f64, f64); 6] = [
    (1.0, 1.0),
    (2.0, 0.7),
    (3.0, 0.5),
    (4.0, 0.4),
    (5.0, 0.3),
    (6.0, 0.2),
];

/// Configuration for one synthesis engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Tuning pitch for A4 in Hz.
    pub tuning_pitch: f64,
    /// Harmonic table used for single notes.
    pub note_harmonics: Vec<(f64, f64)>,
    /// Harmonic table used for chords.
    pub chord_harmonics: Vec<(f64, f64)>,
    /// Weight of the detuned inharmonic partial (string stiffness model).
    pub inharmonic_weight: f64,
    /// Final scaling from the normalized waveform into i16 sample space.
    pub master_scale: f64,
    /// Empirical per-note headroom divisor for chords: amplitude is
    /// pre-divided by `sqrt(note_count) * chord_headroom` so stacked
    /// harmonics cannot hard-clip at full velocity.
    pub chord_headroom: f64,
    /// Amplitude envelope applied to every rendered note.
    pub envelope: PianoEnvelope,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            tuning_pitch: CONCERT_A4_HZ,
            note_harmonics: NOTE_HARMONICS.to_vec(),
            chord_harmonics: CHORD_HARMONICS.to_vec(),
            inharmonic_weight: 0.1,
            master_scale: 6000.0,
            chord_headroom: 2.5,
            envelope: PianoEnvelope::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_piano_model() {
        let cfg = SynthConfig::default();
        assert_eq!(cfg.sample_rate, 44_100);
        assert_eq!(cfg.note_harmonics.len(), 7);
        assert_eq!(cfg.chord_harmonics.len(), 6);
        // 7th harmonic skipped: last note partial is the 8th.
        assert_eq!(cfg.note_harmonics[6].0, 8.0);
        assert!((cfg.chord_headroom - 2.5).abs() < 1e-12);
    }

    #[test]
    fn json_round_trip() {
        let cfg = SynthConfig::default();
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: SynthConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.sample_rate, cfg.sample_rate);
        assert_eq!(back.note_harmonics, cfg.note_harmonics);
        assert!((back.master_scale - cfg.master_scale).abs() < 1e-12);
    }
}
