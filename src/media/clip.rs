//! Аудиоклип: PCM-семплы с частотой дискретизации и числом каналов.
//!
//! Клип является значением: любое преобразование возвращает новый клип.
//! Длительность всегда вычисляется из буфера и нигде не хранится отдельно.

use crate::error::{DubSyncError, Result};

/// Буфер PCM-семплов (f32, чередование каналов)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioClip {
    /// Создать клип из чередующихся семплов
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(DubSyncError::FormatMismatch(format!(
                "clip needs a non-zero sample rate and channel count (got {} Hz, {} ch)",
                sample_rate, channels
            )));
        }
        if samples.len() % channels as usize != 0 {
            return Err(DubSyncError::FormatMismatch(format!(
                "{} samples do not split into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Моно-клип
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, sample_rate, 1)
    }

    /// Тишина заданной длительности
    pub fn silent(duration_ms: u64, sample_rate: u32, channels: u16) -> Result<Self> {
        let frames = ms_to_frames(duration_ms, sample_rate);
        Self::new(vec![0.0; frames * channels.max(1) as usize], sample_rate, channels)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Количество кадров (семплов на канал)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Длительность в миллисекундах, округленная до ближайшего целого
    pub fn duration_ms(&self) -> u64 {
        frames_to_ms(self.frames(), self.sample_rate)
    }

    /// Длительность в секундах
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Тот же клип с другой интерпретацией частоты дискретизации.
    /// Семплы не меняются, поэтому меняются и длительность, и высота тона.
    pub fn reinterpret_rate(&self, sample_rate: u32) -> Result<Self> {
        Self::new(self.samples.clone(), sample_rate, self.channels)
    }

    /// Вырезать диапазон `[start_ms, end_ms)`; границы обрезаются по длине клипа
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> Self {
        let frames = self.frames();
        let start = ms_to_frames(start_ms, self.sample_rate).min(frames);
        let end = ms_to_frames(end_ms, self.sample_rate).clamp(start, frames);
        let ch = self.channels as usize;
        Self {
            samples: self.samples[start * ch..end * ch].to_vec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Копия клипа с умноженной громкостью
    pub fn with_gain(&self, gain: f32) -> Self {
        Self {
            samples: self.samples.iter().map(|s| s * gain).collect(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Копия клипа ровно в `frames` кадров: лишнее отрезается, недостающее заполняется тишиной
    pub fn with_frames(&self, frames: usize) -> Self {
        let mut samples = self.samples.clone();
        samples.resize(frames * self.channels as usize, 0.0);
        Self {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Раскладка каналов для микширования.
    ///
    /// Моно размножается на все каналы, многоканальный звук в моно усредняется,
    /// прочие раскладки проходят через моно.
    pub fn to_channels(&self, channels: u16) -> Result<Self> {
        if channels == 0 {
            return Err(DubSyncError::FormatMismatch(
                "cannot convert to zero channels".to_string(),
            ));
        }
        if channels == self.channels {
            return Ok(self.clone());
        }

        let mono: Vec<f32> = if self.channels == 1 {
            self.samples.clone()
        } else {
            self.samples
                .chunks(self.channels as usize)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        let samples = if channels == 1 {
            mono
        } else {
            let mut out = Vec::with_capacity(mono.len() * channels as usize);
            for sample in mono {
                for _ in 0..channels {
                    out.push(sample);
                }
            }
            out
        };

        Self::new(samples, self.sample_rate, channels)
    }

    /// Разделить на отдельные каналы (планарный вид для ресемплера)
    pub(crate) fn deinterleave(&self) -> Vec<Vec<f32>> {
        let ch = self.channels as usize;
        let mut planes = vec![Vec::with_capacity(self.frames()); ch];
        for frame in self.samples.chunks(ch) {
            for (plane, sample) in planes.iter_mut().zip(frame) {
                plane.push(*sample);
            }
        }
        planes
    }

    /// Собрать клип из планарных каналов; длина берется по самому короткому каналу
    pub(crate) fn from_planes(planes: &[Vec<f32>], sample_rate: u32) -> Result<Self> {
        let frames = planes.iter().map(|p| p.len()).min().unwrap_or(0);
        let mut samples = Vec::with_capacity(frames * planes.len());
        for i in 0..frames {
            for plane in planes {
                samples.push(plane[i]);
            }
        }
        Self::new(samples, sample_rate, planes.len() as u16)
    }
}

/// Миллисекунды в кадры при заданной частоте
pub fn ms_to_frames(ms: u64, sample_rate: u32) -> usize {
    ((ms as u128 * sample_rate as u128 + 500) / 1000) as usize
}

/// Кадры в миллисекунды, с округлением
pub fn frames_to_ms(frames: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    ((frames as u128 * 1000 + sample_rate as u128 / 2) / sample_rate as u128) as u64
}
