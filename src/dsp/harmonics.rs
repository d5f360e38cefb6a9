//! Additive harmonic synthesis.
//!
//! A rendered note is a weighted sum of sine partials at multiples of
//! the fundamental, plus one slightly-detuned inharmonic partial that
//! models real string stiffness, all shaped by the piano envelope and
//! scaled into signed 16-bit sample space.

use std::f64::consts::TAU;

use crate::config::SynthConfig;
use crate::error::SynthError;

/// Upper bound of the signed 16-bit sample range used for clamping.
const I16_CLAMP: f64 = 32767.0;

/// The pure synthesis engine. Owns nothing but its configuration;
/// every call produces a fresh sample buffer.
#[derive(Debug, Clone)]
pub struct Synth {
    config: SynthConfig,
}

impl Synth {
    pub fn new(config: SynthConfig) -> Self {
        Synth { config }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Number of samples in a buffer of `duration` seconds.
    pub fn sample_count(&self, duration: f64) -> usize {
        (self.config.sample_rate as f64 * duration).round() as usize
    }

    /// Render one note at `frequency` Hz for `duration` seconds.
    ///
    /// `amplitude` is a normalized loudness in [0, 1] (velocity / 127).
    /// Produces exactly `round(sample_rate * duration)` samples.
    pub fn synthesize_note(
        &self,
        frequency: f64,
        duration: f64,
        amplitude: f64,
    ) -> Result<Vec<i16>, SynthError> {
        let count = self.sample_count(duration);
        let sr = self.config.sample_rate as f64;
        // String stiffness: the extra partial sits slightly sharp of
        // the fundamental, more so for higher strings.
        let inharmonic = frequency * (1.0 + 0.0002 * frequency / 1000.0);

        let mut samples: Vec<i16> = Vec::new();
        samples.try_reserve_exact(count)?;

        for i in 0..count {
            let t = i as f64 / sr;
            let mut wave = 0.0;
            for &(mult, weight) in &self.config.note_harmonics {
                wave += weight * (TAU * frequency * mult * t).sin();
            }
            wave += self.config.inharmonic_weight * (TAU * inharmonic * t).sin();

            let env = self.config.envelope.amplitude_at(t, duration);
            let value = wave * env * amplitude * self.config.master_scale;
            samples.push(value.clamp(-I16_CLAMP, I16_CLAMP) as i16);
        }
        Ok(samples)
    }

    /// Render a chord: the full harmonic series of every input
    /// frequency is summed per sample before envelope and scaling.
    ///
    /// Per-note amplitude is pre-divided by `sqrt(n) * chord_headroom`
    /// so constructively overlapping harmonics cannot hard-clip even on
    /// large chords at full velocity.
    pub fn synthesize_chord(
        &self,
        frequencies: &[f64],
        duration: f64,
        amplitude: f64,
    ) -> Result<Vec<i16>, SynthError> {
        let count = self.sample_count(duration);
        let mut samples: Vec<i16> = Vec::new();
        samples.try_reserve_exact(count)?;

        if frequencies.is_empty() {
            samples.resize(count, 0);
            return Ok(samples);
        }

        let sr = self.config.sample_rate as f64;
        let per_note =
            amplitude / ((frequencies.len() as f64).sqrt() * self.config.chord_headroom);

        for i in 0..count {
            let t = i as f64 / sr;
            let mut wave = 0.0;
            for &freq in frequencies {
                for &(mult, weight) in &self.config.chord_harmonics {
                    wave += weight * (TAU * freq * mult * t).sin();
                }
            }
            let env = self.config.envelope.amplitude_at(t, duration);
            let value = wave * env * per_note * self.config.master_scale;
            samples.push(value.clamp(-I16_CLAMP, I16_CLAMP) as i16);
        }
        Ok(samples)
    }
}

impl Default for Synth {
    fn default() -> Self {
        Synth::new(SynthConfig::default())
    }
}
