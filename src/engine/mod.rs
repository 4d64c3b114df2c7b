//! Audio Engine Module
//!
//! Core audio types and the codec:
//! - Decoded audio clips
//! - Decoding of speech payloads and assets, canonical PCM encoding

pub mod buffer;
pub mod io;

pub use buffer::{
    calculate_peak, calculate_rms, linear_to_db, secs_to_frames, AudioClip,
    DEFAULT_SAMPLE_RATE,
};
pub use io::{
    decode, encode, generate_stereo_test_tone, generate_test_tone, read_audio_file,
    write_wav_file, WAV_HEADER_LEN,
};
