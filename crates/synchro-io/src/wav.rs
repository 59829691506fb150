//! Raw, format-preserving WAV file I/O.
//!
//! Unlike a generic "decode to f32" WAV reader, [`read_wav_raw`] hands back
//! the file's bit depth and channel count as-is, packed through
//! [`synchro_core::format`]'s conversion rules, so a file input node can
//! downmix in the native bit-width before any sanitization happens (§4.2.1).

use std::path::Path;

use hound::{SampleFormat, WavReader, WavWriter};

use synchro_core::format::{float32_to_pcm, pcm_to_float32};
use synchro_core::{AudioFormat, StreamConfig};

use crate::{Error, Result};

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo, ...).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Decoded [`AudioFormat`] (bit depth + int/float split).
    pub audio_format: AudioFormat,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

/// Maps a `hound` spec to our [`AudioFormat`] tag.
///
/// 32-bit files are assumed integer unless the container's sample-format
/// flag says otherwise (§6: "32-bit files are assumed integer unless
/// external metadata indicates float" - `hound` surfaces that flag
/// directly, so this is exactly that external metadata).
fn audio_format_of(spec: hound::WavSpec) -> Result<AudioFormat> {
    match (spec.bits_per_sample, spec.sample_format) {
        (8, SampleFormat::Int) => Ok(AudioFormat::Int8),
        (16, SampleFormat::Int) => Ok(AudioFormat::Int16),
        (24, SampleFormat::Int) => Ok(AudioFormat::Int24),
        (32, SampleFormat::Int) => Ok(AudioFormat::Int32),
        (32, SampleFormat::Float) => Ok(AudioFormat::Float32),
        (bits, fmt) => Err(Error::Stream(format!("unsupported WAV sample layout: {bits}-bit {fmt:?}"))),
    }
}

fn hound_spec_of(config: &StreamConfig) -> hound::WavSpec {
    let bits_per_sample = (config.audio_format.sample_size_bytes() * 8) as u16;
    let sample_format = if config.audio_format == AudioFormat::Float32 {
        SampleFormat::Float
    } else {
        SampleFormat::Int
    };
    hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate_hz,
        bits_per_sample,
        sample_format,
    }
}

/// Reads WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let audio_format = audio_format_of(spec)?;
    let num_frames = reader.duration() as u64;
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);
    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        audio_format,
        num_frames,
        duration_secs,
    })
}

/// Reads an entire WAV file, returning its [`StreamConfig`] (native bit
/// depth and channel count preserved) and raw interleaved payload bytes in
/// that same native format.
pub fn read_wav_raw<P: AsRef<Path>>(path: P) -> Result<(StreamConfig, Vec<u8>)> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let audio_format = audio_format_of(spec)?;

    let samples_f32: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let payload = float32_to_pcm(audio_format, &samples_f32);
    let config = StreamConfig {
        audio_format,
        sample_rate_hz: spec.sample_rate,
        channels: spec.channels,
        language_tag: None,
    };
    Ok((config, payload))
}

/// Writes raw interleaved bytes in `config`'s native format to a new WAV file.
pub fn write_wav_raw<P: AsRef<Path>>(path: P, config: &StreamConfig, payload: &[u8]) -> Result<()> {
    let hspec = hound_spec_of(config);
    let mut writer = WavWriter::create(path, hspec)?;
    write_samples_into(&mut writer, config.audio_format, payload)?;
    writer.finalize()?;
    Ok(())
}

/// Writes one chunk of raw bytes into an already-open [`WavWriter`], used
/// by [`crate::file_output::FileOutputNode`] for incremental writes.
pub(crate) fn write_samples_into<W: std::io::Write + std::io::Seek>(
    writer: &mut WavWriter<W>,
    format: AudioFormat,
    payload: &[u8],
) -> Result<()> {
    let samples = pcm_to_float32(format, payload);
    if format == AudioFormat::Float32 {
        for s in samples {
            writer.write_sample(s)?;
        }
    } else {
        let bits = (format.sample_size_bytes() * 8) as u32;
        let max_val = ((1i64 << (bits - 1)) - 1) as f32;
        for s in samples {
            writer.write_sample((s * max_val).round() as i32)?;
        }
    }
    Ok(())
}

/// Opens a new [`WavWriter`] for `config`, for incremental-write callers.
pub(crate) fn create_writer<P: AsRef<Path>>(
    path: P,
    config: &StreamConfig,
) -> Result<WavWriter<std::io::BufWriter<std::fs::File>>> {
    Ok(WavWriter::create(path, hound_spec_of(config))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn int16_mono_roundtrips_byte_exact() {
        let config = StreamConfig::mono(AudioFormat::Int16, 16000);
        let samples: Vec<i16> = (0..1000).map(|i| (i * 7 % 30000) as i16 - 15000).collect();
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        let file = NamedTempFile::new().unwrap();
        write_wav_raw(file.path(), &config, &payload).unwrap();

        let (read_config, read_payload) = read_wav_raw(file.path()).unwrap();
        assert_eq!(read_config.audio_format, AudioFormat::Int16);
        assert_eq!(read_config.sample_rate_hz, 16000);
        assert_eq!(read_payload, payload);
    }

    #[test]
    fn stereo_channel_count_preserved() {
        let config = StreamConfig {
            audio_format: AudioFormat::Int16,
            sample_rate_hz: 48000,
            channels: 2,
            language_tag: None,
        };
        let payload = vec![0u8; 4 * 100];

        let file = NamedTempFile::new().unwrap();
        write_wav_raw(file.path(), &config, &payload).unwrap();

        let info = read_wav_info(file.path()).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.num_frames, 100);
    }

    #[test]
    fn float32_file_reads_back_as_float32() {
        let config = StreamConfig::mono(AudioFormat::Float32, 44100);
        let samples: Vec<f32> = (0..500).map(|i| (i as f32 / 500.0) - 0.5).collect();
        let payload = float32_to_pcm(AudioFormat::Float32, &samples);

        let file = NamedTempFile::new().unwrap();
        write_wav_raw(file.path(), &config, &payload).unwrap();

        let (read_config, _) = read_wav_raw(file.path()).unwrap();
        assert_eq!(read_config.audio_format, AudioFormat::Float32);
    }
}
