//! Audio codec for Sweeper
//!
//! Decodes speech-collaborator payloads, uploads and preset assets into
//! [`AudioClip`]s, and encodes rendered clips into the canonical output
//! container: a 44-byte RIFF/WAVE header followed by 16-bit PCM.
//!
//! RIFF/WAVE input goes through `hound`; every other container is probed
//! by `symphonia`.

use std::io::{Cursor, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::engine::buffer::{AudioClip, DEFAULT_SAMPLE_RATE};
use crate::error::{Result, SweeperError};

/// Size of the canonical container header in bytes
pub const WAV_HEADER_LEN: usize = 44;

/// Bits per sample of the canonical container
pub const PCM_BITS_PER_SAMPLE: u16 = 16;

// ============================================================================
// Decoding
// ============================================================================

/// Decode compressed or uncompressed audio bytes into a clip
///
/// An empty payload decodes to a zero-length mono clip at
/// [`DEFAULT_SAMPLE_RATE`].
///
/// # Errors
/// * `Decode` - the bytes are not a recognized container, or the container
///   holds no audio frames
pub fn decode(bytes: &[u8]) -> Result<AudioClip> {
    if bytes.is_empty() {
        return Ok(AudioClip::empty(DEFAULT_SAMPLE_RATE));
    }

    let clip = if is_riff_wave(bytes) {
        match decode_wav(bytes) {
            Ok(clip) => clip,
            Err(wav_err) => {
                debug!(error = %wav_err, "hound rejected RIFF payload, probing with symphonia");
                decode_probed(bytes).map_err(|_| wav_err)?
            }
        }
    } else {
        decode_probed(bytes)?
    };

    if clip.is_empty() {
        return Err(SweeperError::decode("container holds no audio data"));
    }

    debug!(
        channels = clip.channels(),
        sample_rate = clip.sample_rate(),
        frames = clip.len(),
        "decoded audio"
    );
    Ok(clip)
}

/// Read an audio file from disk and decode it
pub fn read_audio_file(path: &Path) -> Result<AudioClip> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

fn is_riff_wave(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

fn decode_wav(bytes: &[u8]) -> Result<AudioClip> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| SweeperError::Decode {
        reason: format!("Failed to parse WAV header: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;

    AudioClip::from_interleaved(&samples, channels, spec.sample_rate)
}

/// Read samples from a WAV reader and convert to f32
///
/// 16-bit input is the exact inverse of [`encode`]'s scaling.
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let wav_err = |bits: &str, e: hound::Error| SweeperError::Decode {
        reason: format!("Failed to read {} samples: {}", bits, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| wav_err("float", e)),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| wav_err("8-bit", e)),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(pcm16_to_f32))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| wav_err("16-bit", e)),
            // 24-bit stored as i32 in hound
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| wav_err("24-bit", e)),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| wav_err("32-bit int", e)),
            other => Err(SweeperError::decode(format!(
                "{}-bit integer audio is not supported",
                other
            ))),
        },
    }
}

/// Decode any container symphonia can probe (MP3, OGG, FLAC, AAC, ...)
fn decode_probed(bytes: &[u8]) -> Result<AudioClip> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| SweeperError::Decode {
            reason: format!("Unrecognized audio container: {}", e),
            source: Some(Box::new(e)),
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SweeperError::decode("no audio track found"))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SweeperError::Decode {
            reason: format!("Unsupported codec: {}", e),
            source: Some(Box::new(e)),
        })?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                warn!(error = %e, "error reading packet, stopping decode");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = %e, "skipping corrupt packet");
                continue;
            }
            Err(e) => {
                return Err(SweeperError::Decode {
                    reason: format!("Decoder failed: {}", e),
                    source: Some(Box::new(e)),
                })
            }
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count();

        let needs_alloc = sample_buf
            .as_ref()
            .map(|buf| buf.capacity() < decoded.capacity() * channels)
            .unwrap_or(true);
        if needs_alloc {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if channels == 0 || sample_rate == 0 || samples.is_empty() {
        return Err(SweeperError::decode("container holds no audio data"));
    }

    AudioClip::from_interleaved(&samples, channels, sample_rate)
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a clip into the canonical 16-bit PCM container
///
/// The output is exactly `WAV_HEADER_LEN + channels * len * 2` bytes.
/// Samples are clamped to [-1, 1], scaled by 32768 when negative and 32767
/// otherwise, rounded, and interleaved frame by frame.
///
/// # Errors
/// * `Encode` - the payload would not fit the container's 32-bit size fields
pub fn encode(clip: &AudioClip) -> Result<Vec<u8>> {
    let channels = clip.channels();
    let payload_len = channels * clip.len() * 2;
    if payload_len > (u32::MAX as usize - 36) || channels > u16::MAX as usize {
        return Err(SweeperError::Encode {
            reason: format!("{} bytes of PCM exceeds the container limit", payload_len),
        });
    }

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + payload_len);
    write_header(&mut out, channels as u16, clip.sample_rate(), payload_len as u32)?;

    for frame in 0..clip.len() {
        for channel in clip.channel_data() {
            out.extend_from_slice(&f32_to_pcm16(channel[frame]).to_le_bytes());
        }
    }

    Ok(out)
}

/// Encode a clip and write it to `path`
pub fn write_wav_file(clip: &AudioClip, path: &Path) -> Result<()> {
    let bytes = encode(clip)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn write_header<W: Write>(
    writer: &mut W,
    channels: u16,
    sample_rate: u32,
    data_size: u32,
) -> std::io::Result<()> {
    let block_align = channels * (PCM_BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * block_align as u32;

    // RIFF header
    writer.write_all(b"RIFF")?;
    writer.write_all(&(36 + data_size).to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    // fmt chunk
    writer.write_all(b"fmt ")?;
    writer.write_all(&16u32.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?; // PCM
    writer.write_all(&channels.to_le_bytes())?;
    writer.write_all(&sample_rate.to_le_bytes())?;
    writer.write_all(&byte_rate.to_le_bytes())?;
    writer.write_all(&block_align.to_le_bytes())?;
    writer.write_all(&PCM_BITS_PER_SAMPLE.to_le_bytes())?;

    // data chunk
    writer.write_all(b"data")?;
    writer.write_all(&data_size.to_le_bytes())?;
    Ok(())
}

/// Convert one float sample to 16-bit PCM
#[inline]
pub fn f32_to_pcm16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    let scaled = if clamped < 0.0 {
        clamped * 32768.0
    } else {
        clamped * 32767.0
    };
    scaled.round() as i16
}

/// Convert one 16-bit PCM sample to float
#[inline]
pub fn pcm16_to_f32(sample: i16) -> f32 {
    if sample < 0 {
        sample as f32 / 32768.0
    } else {
        sample as f32 / 32767.0
    }
}

// ============================================================================
// Test signals
// ============================================================================

/// Generate a mono sine clip
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioClip {
    let num_samples = (duration_secs * sample_rate as f32).round() as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    let samples = (0..num_samples)
        .map(|i| (angular_freq * i as f32).sin())
        .collect();
    AudioClip::mono(samples, sample_rate)
}

/// Generate a stereo clip with a different sine per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioClip {
    let mut channels = generate_test_tone(freq_left, duration_secs, sample_rate).into_channels();
    channels.extend(generate_test_tone(freq_right, duration_secs, sample_rate).into_channels());
    AudioClip::from_channels(channels, sample_rate)
        .unwrap_or_else(|_| AudioClip::silent(2, 0, sample_rate))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_empty_input_decodes_to_empty_clip() {
        let clip = decode(&[]).unwrap();
        assert!(clip.is_empty());
        assert_eq!(clip.sample_rate(), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = decode(b"definitely not audio, just some words");
        match result {
            Err(SweeperError::Decode { .. }) => {}
            other => panic!("Expected Decode error, got: {:?}", other),
        }
    }

    #[test]
    fn test_header_only_wav_is_decode_error() {
        let bytes = encode(&AudioClip::empty(24000)).unwrap();
        assert_eq!(bytes.len(), WAV_HEADER_LEN);
        assert!(matches!(decode(&bytes), Err(SweeperError::Decode { .. })));
    }

    #[test]
    fn test_encoded_size() {
        let clip = generate_stereo_test_tone(440.0, 880.0, 0.25, 24000);
        let bytes = encode(&clip).unwrap();
        assert_eq!(bytes.len(), 2 * clip.len() * 2 + 44);
    }

    #[test]
    fn test_header_fields() {
        let clip = generate_test_tone(440.0, 0.1, 24000);
        let bytes = encode(&clip).unwrap();

        let reader = WavReader::new(Cursor::new(&bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, SampleFormat::Int);
        assert_eq!(reader.len() as usize, clip.len());

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize, bytes.len() - 8);
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 48000);
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 2);
    }

    #[test]
    fn test_pcm_scaling_and_clamping() {
        assert_eq!(f32_to_pcm16(1.0), 32767);
        assert_eq!(f32_to_pcm16(-1.0), -32768);
        assert_eq!(f32_to_pcm16(2.5), 32767);
        assert_eq!(f32_to_pcm16(-7.0), -32768);
        assert_eq!(f32_to_pcm16(0.0), 0);
        assert_eq!(f32_to_pcm16(0.5), 16384);
        assert_eq!(f32_to_pcm16(-0.5), -16384);
    }

    #[test]
    fn test_interleaved_payload_order() {
        let clip =
            AudioClip::from_channels(vec![vec![1.0, 0.0], vec![-1.0, 0.5]], 8000).unwrap();
        let bytes = encode(&clip).unwrap();
        let payload: Vec<i16> = bytes[WAV_HEADER_LEN..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(payload, vec![32767, -32768, 0, 16384]);
    }

    #[test]
    fn test_round_trip_within_quantization() {
        let original = generate_stereo_test_tone(440.0, 660.0, 0.2, 22050);
        let decoded = decode(&encode(&original).unwrap()).unwrap();

        assert_eq!(decoded.sample_rate(), original.sample_rate());
        assert_eq!(decoded.channels(), original.channels());
        assert_eq!(decoded.len(), original.len());

        for ch in 0..2 {
            for (orig, dec) in original.channel(ch).iter().zip(decoded.channel(ch)) {
                assert!(
                    (orig - dec).abs() <= 1.0 / 32767.0,
                    "Sample mismatch in channel {}: {} vs {}",
                    ch,
                    orig,
                    dec
                );
            }
        }
    }

    #[test]
    fn test_decodes_hound_float_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in [0.25_f32, -0.25, 0.75] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }

        let clip = decode(cursor.get_ref()).unwrap();
        assert_eq!(clip.sample_rate(), 16000);
        assert_eq!(clip.channel(0), &[0.25, -0.25, 0.75]);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let original = generate_test_tone(1000.0, 0.1, 24000);
        write_wav_file(&original, &path).unwrap();
        let imported = read_audio_file(&path).unwrap();

        assert_eq!(imported.len(), original.len());
        assert_eq!(imported.channels(), 1);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_audio_file(Path::new("/nonexistent/path/voice.mp3"));
        assert!(matches!(result, Err(SweeperError::Io(_))));
    }
}
