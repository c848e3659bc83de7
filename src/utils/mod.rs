pub mod audio;

pub use audio::{decode_audio_frame, encode_audio_frame, pcm_duration_secs, samples_to_pcm16};
