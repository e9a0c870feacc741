//! Preview audio decoding
//!
//! Uses symphonia for format-agnostic decoding of in-memory previews
//! (MP3, AAC, OGG, WAV ...), mixed down to mono f32.

use super::ProviderError;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded mono audio
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode an in-memory audio file, keeping at most `max_seconds` of audio
pub fn decode_mono(
    bytes: Vec<u8>,
    extension_hint: Option<&str>,
    max_seconds: u32,
) -> Result<DecodedAudio, ProviderError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension_hint {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ProviderError::Parse(format!("Unrecognized preview audio: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ProviderError::Parse("No audio track in preview".to_string()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ProviderError::Parse(format!("Unsupported preview codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(ProviderError::Parse(format!("Error reading packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt frame: skip it and keep going
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!("Skipping undecodable preview packet: {}", e);
                continue;
            }
            Err(e) => return Err(ProviderError::Parse(format!("Decode failed: {}", e))),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        let channels = spec.channels.count().max(1);

        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        if buf.capacity() < decoded.capacity() * channels {
            *buf = SampleBuffer::new(decoded.capacity() as u64, spec);
        }
        buf.copy_interleaved_ref(decoded);

        samples.extend(
            buf.samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );

        if sample_rate > 0 && samples.len() >= (max_seconds as usize) * (sample_rate as usize) {
            break;
        }
    }

    if sample_rate == 0 || samples.is_empty() {
        return Err(ProviderError::Parse("Preview contained no audio".to_string()));
    }

    samples.truncate((max_seconds as usize).max(1) * sample_rate as usize);
    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use hound::{SampleFormat, WavSpec, WavWriter};

    /// 16-bit PCM WAV file with interleaved `samples`
    fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_decode_wav_and_truncate() {
        let rate = 8000;
        let samples: Vec<i16> = (0..rate * 3).map(|i| if i % 2 == 0 { 1000 } else { -1000 }).collect();
        let decoded = decode_mono(wav_bytes(&samples, rate, 1), Some("wav"), 2).unwrap();
        assert_eq!(decoded.sample_rate, rate);
        assert_eq!(decoded.samples.len(), (rate * 2) as usize);
        assert!(decoded.samples.iter().all(|s| s.abs() < 0.05));
    }

    #[test]
    fn test_stereo_is_mixed_down() {
        let rate = 8000;
        // Left channel at half scale, right channel silent
        let samples: Vec<i16> = (0..rate * 2).map(|i| if i % 2 == 0 { 16384 } else { 0 }).collect();
        let decoded = decode_mono(wav_bytes(&samples, rate, 2), None, 30).unwrap();
        assert_eq!(decoded.samples.len(), rate as usize);
        assert!(decoded.samples.iter().all(|s| (s - 0.25).abs() < 0.01));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = decode_mono(vec![0u8; 64], None, 30).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }
}
