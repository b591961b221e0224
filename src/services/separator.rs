//! Разделение исходного аудио на голос и фон.
//!
//! Сама модель внешняя. Частичный результат не принимается: если нет хотя бы
//! одной из дорожек, разделение считается неудачным.

use std::path::{Path, PathBuf};

use log::info;

use crate::error::{DubSyncError, Result};

/// Дорожки после разделения
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatedTracks {
    /// Голос
    pub vocals: PathBuf,
    /// Фон (всё, кроме голоса)
    pub accompaniment: PathBuf,
}

impl SeparatedTracks {
    /// Раскладка файлов Demucs в режиме двух дорожек:
    /// `<output_dir>/<model>/<имя входного файла>/{vocals,no_vocals}.wav`
    pub fn demucs_layout(output_dir: &Path, model: &str, input: &Path) -> Result<Self> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                DubSyncError::Separation(format!("cannot derive a track name from {}", input.display()))
            })?;
        let track_dir = output_dir.join(model).join(stem);
        Ok(Self {
            vocals: track_dir.join("vocals.wav"),
            accompaniment: track_dir.join("no_vocals.wav"),
        })
    }

    /// Проверяет, что обе дорожки существуют
    pub fn verify(&self) -> Result<()> {
        let missing: Vec<String> = [&self.vocals, &self.accompaniment]
            .iter()
            .filter(|p| !p.exists())
            .map(|p| p.display().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DubSyncError::Separation(format!(
                "separated tracks not found: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

/// Разделитель источников
pub trait SourceSeparator: Send + Sync {
    /// Разделяет `input`, складывая результат в `output_dir`
    fn separate(&self, input: &Path, output_dir: &Path) -> Result<SeparatedTracks>;
}

/// Запускает разделение и проверяет, что получены обе дорожки
pub fn separate_checked<S: SourceSeparator + ?Sized>(
    separator: &S,
    input: &Path,
    output_dir: &Path,
) -> Result<SeparatedTracks> {
    if !input.exists() {
        return Err(DubSyncError::FileNotFound(input.display().to_string()));
    }
    std::fs::create_dir_all(output_dir)?;

    info!("Separating {} into {}", input.display(), output_dir.display());
    let tracks = separator.separate(input, output_dir)?;
    tracks.verify()?;
    info!(
        "Separation done: vocals {}, accompaniment {}",
        tracks.vocals.display(),
        tracks.accompaniment.display()
    );
    Ok(tracks)
}
