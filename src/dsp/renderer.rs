//! WAV renderer — packages rendered samples as playable audio assets.
//!
//! The container is a standard RIFF/WAVE file (mono, 16-bit little-endian
//! PCM) wrapped as a `data:audio/wav;base64,` URI so a host audio element
//! can play it without touching the filesystem.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::SynthError;

/// MIME data-URI prefix for the encoded container.
pub const DATA_URI_PREFIX: &str = "data:audio/wav;base64,";

/// Size of the RIFF/fmt/data header preceding the sample bytes.
const WAV_HEADER_LEN: usize = 44;

/// A fully encoded, playable audio asset.
///
/// Immutable once produced. The playback layer owns the lifecycle of
/// whatever element consumes the URI; the asset itself is just bytes.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    data_uri: String,
    sample_rate: u32,
    sample_count: usize,
}

impl AudioAsset {
    /// The `data:audio/wav;base64,...` URI for a host audio element.
    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Playback length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.sample_count as f64 / self.sample_rate as f64
    }
}

/// Encode mono i16 samples to a WAV byte buffer.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, SynthError> {
    let channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(WAV_HEADER_LEN + data_size as usize)?;

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    Ok(buf)
}

/// Encode mono i16 samples into a playable [`AudioAsset`].
pub fn encode_asset(samples: &[i16], sample_rate: u32) -> Result<AudioAsset, SynthError> {
    let wav = encode_wav(samples, sample_rate)?;
    let mut data_uri = String::new();
    data_uri
        .try_reserve_exact(DATA_URI_PREFIX.len() + wav.len().div_ceil(3) * 4)?;
    data_uri.push_str(DATA_URI_PREFIX);
    BASE64.encode_string(&wav, &mut data_uri);
    Ok(AudioAsset {
        data_uri,
        sample_rate,
        sample_count: samples.len(),
    })
}
