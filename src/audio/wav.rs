//! # WAV Container Decoding
//!
//! Parses one utterance submitted as a RIFF/WAVE file and normalises it to the
//! shape the recognizer consumes: 16-bit signed PCM, mono, at the sample rate
//! declared in the header.
//!
//! ## Conversions:
//! - **8-bit**: Scaled up to 16 bits (the reader already re-centres unsigned samples)
//! - **24/32-bit integer**: Truncated to the 16 most significant bits
//! - **32-bit float**: Clamped to [-1.0, 1.0] and scaled
//! - **Multi-channel**: Interleaved frames are averaged into one channel

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};

/// Decoded utterance ready to be fed to a recognizer.
#[derive(Debug, Clone)]
pub struct WavAudio {
    /// Sample rate from the container header (Hz)
    pub sample_rate: u32,
    /// Channel count of the source container (samples are always mono)
    pub source_channels: u16,
    /// Mono 16-bit PCM samples
    pub samples: Vec<i16>,
}

impl WavAudio {
    /// Parse a complete WAV file held in memory.
    ///
    /// ## Errors:
    /// - The bytes are not a readable RIFF/WAVE container
    /// - The header declares a sample rate or channel count of zero
    /// - The sample data is truncated or corrupt
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(bytes)).context("Invalid WAV container")?;
        let spec = reader.spec();

        if spec.sample_rate == 0 {
            bail!("WAV header declares a sample rate of 0");
        }
        if spec.channels == 0 {
            bail!("WAV header declares no audio channels");
        }

        let interleaved = read_pcm16(reader).context("Corrupt WAV sample data")?;
        let samples = downmix(interleaved, spec.channels);

        tracing::debug!(
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            bits_per_sample = spec.bits_per_sample,
            samples = samples.len(),
            "Decoded WAV utterance"
        );

        Ok(Self {
            sample_rate: spec.sample_rate,
            source_channels: spec.channels,
            samples,
        })
    }

    /// Duration of the utterance in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

fn read_pcm16<R: Read>(reader: WavReader<R>) -> Result<Vec<i16>, hound::Error> {
    let spec = reader.spec();

    match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|sample| sample.map(float_to_pcm16))
            .collect(),
        SampleFormat::Int => reader
            .into_samples::<i32>()
            .map(|sample| sample.map(|s| int_to_pcm16(s, spec.bits_per_sample)))
            .collect(),
    }
}

fn int_to_pcm16(sample: i32, bits_per_sample: u16) -> i16 {
    if bits_per_sample <= 16 {
        (sample << (16 - bits_per_sample)) as i16
    } else {
        (sample >> (bits_per_sample - 16)) as i16
    }
}

fn float_to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn downmix(interleaved: Vec<i16>, channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return interleaved;
    }

    interleaved
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

/// Build an in-memory 16-bit PCM WAV file (test fixture helper).
#[cfg(test)]
pub fn encode_pcm16(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
    cursor.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn encode_with<S: hound::Sample + Copy>(spec: WavSpec, samples: &[S]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_parse_mono_pcm16() {
        let samples: Vec<i16> = (0..8000).map(|i| (i % 200) as i16 - 100).collect();
        let bytes = encode_pcm16(16000, 1, &samples);

        let audio = WavAudio::parse(&bytes).unwrap();
        assert_eq!(audio.sample_rate, 16000);
        assert_eq!(audio.source_channels, 1);
        assert_eq!(audio.samples, samples);
        assert!((audio.duration_seconds() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_stereo_is_downmixed() {
        let bytes = encode_pcm16(8000, 2, &[100, 300, -200, -400]);

        let audio = WavAudio::parse(&bytes).unwrap();
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.source_channels, 2);
        assert_eq!(audio.samples, vec![200, -300]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = WavAudio::parse(b"definitely not a wav file").unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid WAV container"));
    }

    #[test]
    fn test_eight_bit_is_scaled() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 8,
            sample_format: SampleFormat::Int,
        };
        let bytes = encode_with(spec, &[0i8, -128, 127]);

        let audio = WavAudio::parse(&bytes).unwrap();
        assert_eq!(audio.samples, vec![0, -32768, 32512]);
    }

    #[test]
    fn test_twenty_four_bit_is_truncated() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        let bytes = encode_with(spec, &[0x7F_FF00i32, -0x80_0000, 0x100]);

        let audio = WavAudio::parse(&bytes).unwrap();
        assert_eq!(audio.samples, vec![0x7FFF, -0x8000, 1]);
    }

    #[test]
    fn test_float_is_clamped() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let bytes = encode_with(spec, &[0.0f32, 2.0, -2.0]);

        let audio = WavAudio::parse(&bytes).unwrap();
        assert_eq!(audio.samples, vec![0, i16::MAX, -i16::MAX]);
    }
}
