//! Модуль конфигурации библиотеки dub-sync
//!
//! Все пороги алгоритмов выравнивания и разбиения текста собраны здесь.
//! Значения по умолчанию совпадают с параметрами исходного конвейера дубляжа.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DubSyncError, Result};

/// Настройки разбиения текста для синтезатора
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Максимальная длина фрагмента в символах (лимит синтезатора)
    pub max_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self { max_chars: 250 }
    }
}

/// Допустимые частоты дискретизации при изменении скорости
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateConfig {
    /// Нижняя граница частоты, Гц
    pub min_sample_rate: u32,
    /// Верхняя граница частоты, Гц
    pub max_sample_rate: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            min_sample_rate: 8_000,
            max_sample_rate: 48_000,
        }
    }
}

/// Параметры выравнивания клипов по слотам
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Отношение длительностей, выше которого клип ускоряется
    pub speedup_threshold: f64,
    /// Максимальный коэффициент ускорения
    pub max_speedup: f64,
    /// Отступ от конца слота для первого сегмента, мс
    pub intro_tail_buffer_ms: i64,
    /// Запас после последнего сегмента, если длительность видео неизвестна, мс
    pub canvas_margin_ms: u64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            speedup_threshold: 1.1,
            max_speedup: 1.25,
            intro_tail_buffer_ms: 200,
            canvas_margin_ms: 2_000,
        }
    }
}

/// Формат итоговой речевой дорожки
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputFormat {
    /// Частота дискретизации холста
    pub sample_rate: u32,
    /// Количество каналов холста
    pub channels: u16,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            channels: 1,
        }
    }
}

/// Параметры сведения с фоновой дорожкой
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MixConfig {
    /// Множитель громкости фона (1.0 = без изменений)
    pub background_gain: f32,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            background_gain: 0.8,
        }
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DubSyncConfig {
    pub segmenter: SegmenterConfig,
    pub rate: RateConfig,
    pub alignment: AlignmentConfig,
    pub output: OutputFormat,
    pub mix: MixConfig,
    /// Удалять временные файлы фрагментов после склейки
    pub cleanup_temp_files: bool,
}

impl Default for DubSyncConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            rate: RateConfig::default(),
            alignment: AlignmentConfig::default(),
            output: OutputFormat::default(),
            mix: MixConfig::default(),
            cleanup_temp_files: true,
        }
    }
}

impl DubSyncConfig {
    /// Загрузить конфигурацию из JSON-файла; отсутствующие поля берутся по умолчанию
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DubSyncError::Configuration(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: DubSyncConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Проверить, что параметры не ломают алгоритмы
    pub fn validate(&self) -> Result<()> {
        if self.segmenter.max_chars == 0 {
            return Err(DubSyncError::Configuration(
                "segmenter.max_chars must be greater than zero".to_string(),
            ));
        }
        if self.rate.min_sample_rate == 0 || self.rate.min_sample_rate > self.rate.max_sample_rate {
            return Err(DubSyncError::Configuration(format!(
                "invalid rate bounds: {}..{}",
                self.rate.min_sample_rate, self.rate.max_sample_rate
            )));
        }
        let alignment = &self.alignment;
        if !alignment.speedup_threshold.is_finite() || alignment.speedup_threshold < 1.0 {
            return Err(DubSyncError::Configuration(format!(
                "alignment.speedup_threshold must be >= 1.0, got {}",
                alignment.speedup_threshold
            )));
        }
        if !alignment.max_speedup.is_finite() || alignment.max_speedup < 1.0 {
            return Err(DubSyncError::Configuration(format!(
                "alignment.max_speedup must be >= 1.0, got {}",
                alignment.max_speedup
            )));
        }
        if alignment.intro_tail_buffer_ms < 0 {
            return Err(DubSyncError::Configuration(
                "alignment.intro_tail_buffer_ms must not be negative".to_string(),
            ));
        }
        if self.output.sample_rate == 0 || self.output.channels == 0 {
            return Err(DubSyncError::Configuration(
                "output format needs a non-zero sample rate and channel count".to_string(),
            ));
        }
        if !self.mix.background_gain.is_finite() || self.mix.background_gain < 0.0 {
            return Err(DubSyncError::Configuration(format!(
                "mix.background_gain must be a non-negative number, got {}",
                self.mix.background_gain
            )));
        }
        Ok(())
    }
}
