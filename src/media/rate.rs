//! Изменение скорости воспроизведения клипа.
//!
//! Скорость меняется подменой частоты дискретизации: семплы интерпретируются
//! на частоте `rate * multiplier`, после чего ресемплируются обратно на исходную
//! частоту. Запрошенная частота всегда ограничивается диапазоном из [`RateConfig`],
//! поэтому итоговое ускорение может быть меньше запрошенного. Ошибок у операции нет:
//! если rubato не справился, используется линейная интерполяция.

use log::{debug, error, warn};
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use crate::config::RateConfig;
use crate::error::{DubSyncError, Result};
use crate::media::clip::AudioClip;

const CHUNK_FRAMES: usize = 1024;
const SINC_LEN: usize = 256;

/// Регулятор скорости с безопасными границами частоты
#[derive(Debug, Clone, Default)]
pub struct RateAdjuster {
    config: RateConfig,
}

impl RateAdjuster {
    pub fn new(config: RateConfig) -> Self {
        Self { config }
    }

    /// Частота, на которой будут интерпретированы семплы при данном множителе
    pub fn clamp_rate(&self, sample_rate: u32, multiplier: f64) -> u32 {
        let min = self.config.min_sample_rate as f64;
        let max = self.config.max_sample_rate as f64;

        let requested = if multiplier.is_nan() {
            warn!("NaN speed multiplier, keeping the original rate");
            sample_rate as f64
        } else {
            (sample_rate as f64 * multiplier).round()
        };

        // Перевернутые границы не должны ронять обработку: верхняя граница главнее
        let clamped = requested.max(min).min(max);
        if clamped != requested {
            warn!(
                "Requested rate {:.0} Hz (x{:.3}) is outside {:.0}..{:.0} Hz, clamped to {:.0} Hz",
                requested, multiplier, min, max, clamped
            );
        }
        clamped as u32
    }

    /// Новый клип, длительность которого поделена на множитель (с учетом ограничений частоты)
    pub fn change_speed(&self, clip: &AudioClip, multiplier: f64) -> AudioClip {
        let source_rate = clip.sample_rate();
        let new_rate = self.clamp_rate(source_rate, multiplier);
        if new_rate == source_rate || clip.is_empty() {
            return clip.clone();
        }

        debug!(
            "Changing speed x{:.3}: reading {} Hz clip at {} Hz",
            multiplier, source_rate, new_rate
        );
        let planes = clip.deinterleave();
        let out = resample_planes(&planes, new_rate, source_rate);
        // Частота и раскладка каналов проверены при создании исходного клипа
        AudioClip::from_planes(&out, source_rate).unwrap_or_else(|_| clip.clone())
    }
}

/// Переводит клип на другую частоту дискретизации без изменения длительности
pub fn resample(clip: &AudioClip, target_rate: u32) -> AudioClip {
    if target_rate == 0 || clip.sample_rate() == target_rate || clip.is_empty() {
        return clip.clone();
    }
    let out = resample_planes(&clip.deinterleave(), clip.sample_rate(), target_rate);
    AudioClip::from_planes(&out, target_rate).unwrap_or_else(|_| clip.clone())
}

/// Число кадров после перевода `frames` кадров с частоты `from` на `to`
pub fn expected_frames(frames: usize, from: u32, to: u32) -> usize {
    ((frames as u128 * to as u128 + from as u128 / 2) / from as u128) as usize
}

fn resample_planes(planes: &[Vec<f32>], from: u32, to: u32) -> Vec<Vec<f32>> {
    let frames = planes.first().map(|p| p.len()).unwrap_or(0);
    let target_frames = expected_frames(frames, from, to);

    let mut out = match stretch_with_rubato(planes, from, to, target_frames) {
        Ok(out) => out,
        Err(e) => {
            error!("Rubato failed ({}), falling back to linear interpolation", e);
            planes
                .iter()
                .map(|p| resample_linear(p, target_frames))
                .collect()
        }
    };

    // Длина результата задается точно, независимо от блочной обработки
    for plane in out.iter_mut() {
        plane.resize(target_frames, 0.0);
    }
    out
}

fn stretch_with_rubato(
    planes: &[Vec<f32>],
    from: u32,
    to: u32,
    target_frames: usize,
) -> Result<Vec<Vec<f32>>> {
    let ratio = to as f64 / from as f64;

    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, planes.len())
        .map_err(|e| DubSyncError::Resampling(format!("failed to create resampler: {}", e)))?;

    // Выход SincFixedIn уже выровнен по времени, задержку вычитать не нужно
    let mut out: Vec<Vec<f32>> = vec![Vec::with_capacity(target_frames + CHUNK_FRAMES); planes.len()];
    let mut pos = 0;
    while out[0].len() < target_frames {
        // Хвост исходника дополняется тишиной до полного блока
        let block: Vec<Vec<f32>> = planes
            .iter()
            .map(|plane| {
                let mut chunk = vec![0.0; CHUNK_FRAMES];
                if pos < plane.len() {
                    let end = (pos + CHUNK_FRAMES).min(plane.len());
                    chunk[..end - pos].copy_from_slice(&plane[pos..end]);
                }
                chunk
            })
            .collect();

        let processed = resampler
            .process(&block, None)
            .map_err(|e| DubSyncError::Resampling(format!("resampling failed: {}", e)))?;

        for (dst, src) in out.iter_mut().zip(processed) {
            dst.extend_from_slice(&src);
        }
        pos += CHUNK_FRAMES;
    }

    for plane in out.iter_mut() {
        plane.truncate(target_frames);
    }
    Ok(out)
}

fn resample_linear(input: &[f32], target_frames: usize) -> Vec<f32> {
    if input.is_empty() || target_frames == 0 {
        return vec![0.0; target_frames];
    }
    if input.len() == 1 || target_frames == 1 {
        return vec![input[0]; target_frames];
    }

    let step = (input.len() - 1) as f64 / (target_frames - 1) as f64;
    (0..target_frames)
        .map(|i| {
            let position = i as f64 * step;
            let idx = position.floor() as usize;
            let frac = (position - idx as f64) as f32;
            let a = input[idx];
            let b = input[(idx + 1).min(input.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}
