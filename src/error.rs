use std::fmt;

/// Errors surfaced by the synthesis engine and the playback layer.
///
/// Audio is a non-critical feature for host applications: none of these
/// are fatal, and the playback layer is expected to degrade to silence
/// rather than crash the host.
#[derive(Debug)]
pub enum SynthError {
    /// The selected playback backend is not usable on this platform.
    /// Reported once, at startup, from `Player::new`.
    BackendUnavailable { backend: &'static str },
    /// Sample buffer allocation or container encoding failed
    /// (resource exhaustion).
    Encoding { detail: String },
    /// The underlying platform audio element rejected playback.
    Playback { pitch: u8, detail: String },
    /// Operation attempted on a player that has been disposed.
    Disposed,
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::BackendUnavailable { backend } => {
                write!(f, "Playback backend '{backend}' is unavailable on this platform")
            }
            SynthError::Encoding { detail } => write!(f, "Audio encoding failed: {detail}"),
            SynthError::Playback { pitch, detail } => {
                write!(f, "Playback failed for pitch {pitch}: {detail}")
            }
            SynthError::Disposed => write!(f, "Player has been disposed"),
        }
    }
}

impl std::error::Error for SynthError {}

impl From<std::collections::TryReserveError> for SynthError {
    fn from(e: std::collections::TryReserveError) -> Self {
        SynthError::Encoding {
            detail: format!("buffer allocation failed: {e}"),
        }
    }
}
