//! Склейка аудио фрагментов одного сегмента в единый клип.
//!
//! Фрагменты соединяются встык в порядке номеров, без кроссфейда.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{DubSyncError, Result};
use crate::media::audio_format::{decode_audio_file, encode_wav};
use crate::media::clip::AudioClip;

/// Склеивает клипы фрагментов в один клип.
///
/// Один клип возвращается как есть. Все клипы должны иметь одинаковые
/// частоту дискретизации и число каналов.
pub fn stitch_clips(clips: Vec<AudioClip>) -> Result<AudioClip> {
    let mut clips = clips.into_iter();
    let first = clips
        .next()
        .ok_or_else(|| DubSyncError::Synthesis("no chunk audio to stitch".to_string()))?;

    let sample_rate = first.sample_rate();
    let channels = first.channels();
    let mut samples = first.into_samples();

    for (offset, clip) in clips.enumerate() {
        if clip.sample_rate() != sample_rate || clip.channels() != channels {
            return Err(DubSyncError::FormatMismatch(format!(
                "chunk {} is {} Hz/{} ch, expected {} Hz/{} ch",
                offset + 1,
                clip.sample_rate(),
                clip.channels(),
                sample_rate,
                channels
            )));
        }
        samples.extend_from_slice(clip.samples());
    }

    AudioClip::new(samples, sample_rate, channels)
}

/// Склеивает файлы фрагментов в `output`.
///
/// Единственный фрагмент копируется побайтно, без перекодирования.
pub fn stitch_files(inputs: &[PathBuf], output: &Path) -> Result<PathBuf> {
    match inputs {
        [] => Err(DubSyncError::Synthesis("no chunk files to stitch".to_string())),
        [single] => {
            if !single.exists() {
                return Err(DubSyncError::FileNotFound(single.display().to_string()));
            }
            std::fs::copy(single, output)?;
            debug!("Single chunk copied to {}", output.display());
            Ok(output.to_path_buf())
        }
        many => {
            let clips = many
                .iter()
                .map(decode_audio_file)
                .collect::<Result<Vec<_>>>()?;
            let stitched = stitch_clips(clips)?;
            encode_wav(&stitched, output)?;
            info!(
                "Stitched {} chunks into {} ({} ms)",
                many.len(),
                output.display(),
                stitched.duration_ms()
            );
            Ok(output.to_path_buf())
        }
    }
}
