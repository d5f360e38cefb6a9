//! Equal-tempered tuning math and input range policy.
//!
//! Pitch is a MIDI-style note number (0–127, A4 = 69). The playback
//! layer clamps out-of-range input instead of failing, so that UI
//! callers can always reach the playback path.

/// Frequency of A4 (MIDI 69) in standard concert tuning.
pub const CONCERT_A4_HZ: f64 = 440.0;

/// Default velocity used when a caller does not specify one.
pub const DEFAULT_VELOCITY: u8 = 100;

/// Convert a MIDI note number to frequency using the given tuning pitch.
///
/// `tuning_pitch` is the frequency of A4 (MIDI 69).
/// Formula: `tuning_pitch * 2^((midi - 69) / 12)`
pub fn midi_to_frequency(midi: u8, tuning_pitch: f64) -> f64 {
    tuning_pitch * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

/// Convert a frequency back to the nearest MIDI note number.
///
/// Inverse of `midi_to_frequency`. A host-display utility, for callers
/// that only hold a frequency and want the note it corresponds to.
pub fn frequency_to_midi(freq: f64, tuning_pitch: f64) -> u8 {
    if freq <= 0.0 {
        return 0;
    }
    let midi = 69.0 + 12.0 * (freq / tuning_pitch).log2();
    midi.round().clamp(0.0, 127.0) as u8
}

/// Clamp an arbitrary integer to the valid pitch range [0, 127].
pub fn clamp_pitch(pitch: i32) -> u8 {
    pitch.clamp(0, 127) as u8
}

/// Clamp an arbitrary integer to the valid velocity range [1, 127].
pub fn clamp_velocity(velocity: i32) -> u8 {
    velocity.clamp(1, 127) as u8
}

/// Map a velocity [1, 127] to a normalized amplitude (0, 1].
pub fn velocity_to_amplitude(velocity: u8) -> f64 {
    velocity as f64 / 127.0
}
