//! # Audio Format Handling
//!
//! Декодирование аудиофайлов в [`AudioClip`] и запись клипов в WAV.
//!
//! - WAV читается через hound (8/16/24/32 бит, целые и float)
//! - MP3, AAC, FLAC, OGG и дорожки MP4 читаются через symphonia
//! - Раскладка каналов сохраняется, в моно ничего не сводится
//! - Запись всегда идет в 16-битный PCM WAV

use std::fs::File;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{DubSyncError, Result};
use crate::media::clip::{frames_to_ms, AudioClip};

/// Декодирует аудиофайл в клип.
///
/// Формат выбирается по расширению: `wav` читается hound, все остальное
/// отдается symphonia (для неизвестных расширений формат определяется по содержимому).
///
/// # Ошибки
///
/// * `DubSyncError::FileNotFound` - файла нет
/// * `DubSyncError::WavEncoding` - некорректный WAV
/// * `DubSyncError::Decoding` - symphonia не смогла распознать или декодировать поток
pub fn decode_audio_file<P: AsRef<Path>>(file_path: P) -> Result<AudioClip> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(DubSyncError::FileNotFound(file_path.display().to_string()));
    }

    let extension = extension_of(file_path);
    let clip = if extension == "wav" {
        decode_wav_file(file_path)?
    } else {
        decode_with_symphonia(file_path, &extension)?
    };

    debug!(
        "Decoded {} ({} frames, {} Hz, {} ch)",
        file_path.display(),
        clip.frames(),
        clip.sample_rate(),
        clip.channels()
    );
    Ok(clip)
}

/// Декодирует WAV-файл через hound
pub fn decode_wav_file<P: AsRef<Path>>(file_path: P) -> Result<AudioClip> {
    let mut reader = WavReader::open(file_path.as_ref())?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, hound::Error>>()?,
        (format, bits) => {
            return Err(DubSyncError::Decoding(format!(
                "unsupported WAV format: {:?}, {} bit",
                format, bits
            )));
        }
    };

    AudioClip::new(samples, spec.sample_rate, spec.channels)
}

fn open_format(file_path: &Path, extension: &str) -> Result<Box<dyn FormatReader>> {
    let file = File::open(file_path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if !extension.is_empty() {
        hint.with_extension(extension);
    }

    let format_opts = FormatOptions {
        enable_gapless: true,
        ..Default::default()
    };

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &MetadataOptions::default())
        .map_err(|e| {
            DubSyncError::Decoding(format!(
                "unrecognised audio container {}: {}",
                file_path.display(),
                e
            ))
        })?;

    Ok(probed.format)
}

fn decode_with_symphonia(file_path: &Path, extension: &str) -> Result<AudioClip> {
    let mut format = open_format(file_path, extension)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            DubSyncError::Decoding(format!("no audio track in {}", file_path.display()))
        })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| DubSyncError::Decoding(format!("failed to create decoder: {}", e)))?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels = codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);
    let mut pcm_data = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(DubSyncError::Decoding(format!(
                    "failed to read packet from {}: {}",
                    file_path.display(),
                    e
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                pcm_data.extend_from_slice(sample_buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Битый пакет пропускаем, как и большинство плееров
                warn!("Skipping undecodable packet in {}: {}", file_path.display(), e);
            }
            Err(e) => {
                return Err(DubSyncError::Decoding(format!(
                    "decoder failure in {}: {}",
                    file_path.display(),
                    e
                )));
            }
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(DubSyncError::Decoding(format!(
            "could not determine audio format of {}",
            file_path.display()
        )));
    }

    AudioClip::new(pcm_data, sample_rate, channels)
}

/// Длительность звуковой дорожки файла в миллисекундах.
///
/// Для WAV читается только заголовок; для остальных форматов используется
/// число кадров из параметров кодека, а если контейнер его не сообщает,
/// дорожка декодируется целиком.
pub fn probe_duration_ms<P: AsRef<Path>>(file_path: P) -> Result<u64> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(DubSyncError::FileNotFound(file_path.display().to_string()));
    }

    let extension = extension_of(file_path);
    if extension == "wav" {
        let reader = WavReader::open(file_path)?;
        return Ok(frames_to_ms(
            reader.duration() as usize,
            reader.spec().sample_rate,
        ));
    }

    let format = open_format(file_path, &extension)?;
    let known = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .and_then(|t| match (t.codec_params.n_frames, t.codec_params.sample_rate) {
            (Some(frames), Some(rate)) => Some(frames_to_ms(frames as usize, rate)),
            _ => None,
        });

    match known {
        Some(duration_ms) => Ok(duration_ms),
        None => Ok(decode_with_symphonia(file_path, &extension)?.duration_ms()),
    }
}

/// Записывает клип в 16-битный PCM WAV.
///
/// Значения за пределами [-1.0, 1.0] жестко ограничиваются при квантовании.
pub fn encode_wav<P: AsRef<Path>>(clip: &AudioClip, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    let spec = WavSpec {
        channels: clip.channels(),
        sample_rate: clip.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(output_path, spec)?;
    let mut clipped = 0usize;
    for &sample in clip.samples() {
        if sample.abs() > 1.0 {
            clipped += 1;
        }
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;

    if clipped > 0 {
        warn!(
            "{} samples exceeded full scale and were clipped while writing {}",
            clipped,
            output_path.display()
        );
    }
    info!(
        "Saved WAV: {} ({} ms, {} Hz, {} ch)",
        output_path.display(),
        clip.duration_ms(),
        clip.sample_rate(),
        clip.channels()
    );
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_wav_encode_decode_keeps_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let samples: Vec<f32> = (0..2_000)
            .map(|i| if i % 2 == 0 { 0.25 } else { -0.5 })
            .collect();
        let clip = AudioClip::new(samples, 16_000, 2).unwrap();
        encode_wav(&clip, &path).unwrap();

        let decoded = decode_audio_file(&path).unwrap();
        assert_eq!(decoded.sample_rate(), 16_000);
        assert_eq!(decoded.channels(), 2);
        assert_eq!(decoded.frames(), 1_000);
        for (a, b) in clip.samples().iter().zip(decoded.samples()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_out_of_range_samples_are_clamped_on_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hot.wav");
        let clip = AudioClip::mono(vec![1.7, -3.0, 0.5], 8_000).unwrap();
        encode_wav(&clip, &path).unwrap();

        let decoded = decode_wav_file(&path).unwrap();
        assert!((decoded.samples()[0] - 1.0).abs() < 1e-3);
        assert!((decoded.samples()[1] + 1.0).abs() < 1e-3);
        assert!((decoded.samples()[2] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_probe_duration_reads_wav_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.wav");
        let clip = AudioClip::silent(3_250, 22_050, 1).unwrap();
        encode_wav(&clip, &path).unwrap();

        assert_eq!(probe_duration_ms(&path).unwrap(), 3_250);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let result = decode_audio_file("/no/such/clip.wav");
        assert!(matches!(result, Err(DubSyncError::FileNotFound(_))));
        assert!(probe_duration_ms("/no/such/video.mp4").is_err());
    }

    #[test]
    fn test_garbage_is_a_decoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"definitely not an mpeg stream").unwrap();
        assert!(decode_audio_file(&path).is_err());
    }

    #[test]
    fn test_ogg_container_is_registered() {
        // Vorbis без демультиплексора OGG не читается
        let reader = std::any::type_name::<symphonia::default::formats::OggReader>();
        assert!(reader.contains("OggReader"));

        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.ogg");
        std::fs::write(&path, b"OggS but not really").unwrap();
        assert!(matches!(decode_audio_file(&path), Err(DubSyncError::Decoding(_))));
    }
}
