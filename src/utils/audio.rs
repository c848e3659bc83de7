//! PCM conversion and wire-frame codecs shared by the audio pipeline and the
//! live transport.
//!
//! The capture side produces 32-bit float samples in `[-1.0, 1.0]`; the wire
//! carries 16-bit signed little-endian PCM, base64 encoded per frame.

use base64::prelude::*;
use bytes::Bytes;

/// Convert float samples to 16-bit signed little-endian PCM bytes.
///
/// Samples are clamped to `[-1.0, 1.0]` before scaling so that clipping input
/// cannot wrap around to the opposite sign.
pub fn samples_to_pcm16(samples: &[f32]) -> Bytes {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * 32767.0) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    Bytes::from(out)
}

/// Base64-encode a PCM frame for the transport's wire representation.
pub fn encode_audio_frame(pcm: &[u8]) -> String {
    BASE64_STANDARD.encode(pcm)
}

/// Decode a base64 wire frame back into raw PCM bytes.
pub fn decode_audio_frame(encoded: &str) -> Result<Bytes, base64::DecodeError> {
    BASE64_STANDARD.decode(encoded).map(Bytes::from)
}

/// Duration in seconds of a mono 16-bit PCM buffer at the given sample rate.
pub fn pcm_duration_secs(pcm_len: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    (pcm_len / 2) as f64 / sample_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_to_pcm16_scaling() {
        let pcm = samples_to_pcm16(&[0.0, 1.0, -1.0]);
        assert_eq!(&pcm[0..2], &0i16.to_le_bytes());
        assert_eq!(&pcm[2..4], &32767i16.to_le_bytes());
        assert_eq!(&pcm[4..6], &(-32767i16).to_le_bytes());
    }

    #[test]
    fn test_samples_to_pcm16_clamps_out_of_range() {
        let pcm = samples_to_pcm16(&[2.0, -3.5]);
        assert_eq!(&pcm[0..2], &32767i16.to_le_bytes());
        assert_eq!(&pcm[2..4], &(-32767i16).to_le_bytes());
    }

    #[test]
    fn test_frame_codec_round_trip() {
        let pcm = samples_to_pcm16(&[0.25, -0.25, 0.5]);
        let encoded = encode_audio_frame(&pcm);
        let decoded = decode_audio_frame(&encoded).unwrap();
        assert_eq!(decoded, pcm);
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        assert!(decode_audio_frame("not base64!!!").is_err());
    }

    #[test]
    fn test_pcm_duration() {
        // 16000 samples of mono 16-bit PCM at 16kHz is one second.
        assert_eq!(pcm_duration_secs(32000, 16000), 1.0);
        assert_eq!(pcm_duration_secs(24000 * 2, 24000), 1.0);
        assert_eq!(pcm_duration_secs(100, 0), 0.0);
    }
}
