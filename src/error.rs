//! Модуль обработки ошибок библиотеки dub-sync
//!
//! Ошибки здесь только фатальные: пропуск сегмента без клипа и ограничение
//! коэффициентов не являются ошибками и лишь логируются.

use thiserror::Error;

/// Ошибки библиотеки dub-sync
#[derive(Debug, Error)]
pub enum DubSyncError {
    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка чтения или записи WAV
    #[error("WAV error: {0}")]
    WavEncoding(#[from] hound::Error),

    /// Ошибка декодирования аудио (symphonia)
    #[error("Audio decoding error: {0}")]
    Decoding(String),

    /// Ошибка ресемплинга (rubato)
    #[error("Resampling error: {0}")]
    Resampling(String),

    /// Несовместимые параметры клипов
    #[error("Audio format mismatch: {0}")]
    FormatMismatch(String),

    /// Некорректный сегмент временной шкалы
    #[error("Invalid segment: {0}")]
    InvalidSegment(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Файл не найден
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Ошибка сведения дорожек
    #[error("Mixing error: {0}")]
    Mixing(String),

    /// Ошибка синтеза речи
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Ошибка разделения источников
    #[error("Source separation error: {0}")]
    Separation(String),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<&str> for DubSyncError {
    fn from(s: &str) -> Self {
        DubSyncError::Other(anyhow::anyhow!(s.to_string()))
    }
}

impl From<String> for DubSyncError {
    fn from(s: String) -> Self {
        DubSyncError::Other(anyhow::anyhow!(s))
    }
}

/// Тип Result для библиотеки dub-sync
pub type Result<T> = std::result::Result<T, DubSyncError>;
