//! PCM-to-WAV encoding.
//!
//! The networked synthesizer returns headerless little-endian 16-bit mono
//! PCM. Players want a self-describing container, so we prepend the
//! canonical 44-byte RIFF/WAVE header and keep the samples untouched.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::VoiceError;

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = CHANNELS * BITS_PER_SAMPLE / 8;
const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Wrap raw 16-bit mono PCM bytes in a WAV container.
///
/// The data section is `pcm` verbatim; an odd trailing byte is kept as-is
/// and only reflected in the declared data size.
#[must_use]
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    // RIFF sizes are u32; a chunk larger than 4 GiB is not a real input.
    #[allow(clippy::cast_possible_truncation)]
    let data_len = pcm.len() as u32;
    let byte_rate = sample_rate * u32::from(BLOCK_ALIGN);

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    wav.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

/// Decode a base64 PCM payload and wrap it in a WAV container.
pub fn base64_pcm_to_wav(payload: &str, sample_rate: u32) -> Result<Vec<u8>, VoiceError> {
    let pcm = STANDARD
        .decode(payload.trim())
        .map_err(|e| VoiceError::InvalidAudioPayload(e.to_string()))?;
    Ok(pcm16_to_wav(&pcm, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    #[test]
    fn four_sample_header_fields() {
        let pcm = [0x01, 0x00, 0xff, 0x7f, 0x00, 0x80, 0x34, 0x12];
        let wav = pcm16_to_wav(&pcm, 24_000);

        assert_eq!(wav.len(), WAV_HEADER_LEN + 8);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 36 + 8);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(u32_at(&wav, 24), 24_000);
        assert_eq!(u32_at(&wav, 28), 48_000);
        assert_eq!(u16_at(&wav, 32), 2);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 8);
        assert_eq!(&wav[44..], &pcm);
    }

    #[test]
    fn empty_pcm_is_header_only() {
        let wav = pcm16_to_wav(&[], 16_000);
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(u32_at(&wav, 40), 0);
        assert_eq!(u32_at(&wav, 28), 32_000);
    }

    #[test]
    fn base64_payload_is_decoded() {
        // [1, 2, 3, 4] in base64
        let wav = base64_pcm_to_wav("AQIDBA==", 24_000).unwrap();
        assert_eq!(&wav[44..], &[1, 2, 3, 4]);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = base64_pcm_to_wav("not base64!!", 24_000).unwrap_err();
        assert!(matches!(err, VoiceError::InvalidAudioPayload(_)));
    }
}
