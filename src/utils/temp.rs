//! Модуль для работы с временными файлами фрагментов
//!
//! Рабочая область живет ровно столько, сколько синтез и склейка одного сегмента.
//! Файлы удаляются в `Drop`, то есть на любом пути выхода, включая ошибки.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;

use crate::error::Result;

/// Временная директория для аудио фрагментов одного сегмента
pub struct ChunkWorkspace {
    /// Временная директория
    temp_dir: Option<TempDir>,
    /// Выданные пути к файлам фрагментов
    files: Vec<PathBuf>,
    /// Удалять ли файлы при завершении
    cleanup: bool,
}

impl ChunkWorkspace {
    /// Создать рабочую область в системной временной директории
    pub fn new(cleanup: bool) -> Result<Self> {
        let temp_dir = tempfile::Builder::new().prefix("dub-sync-chunks-").tempdir()?;
        debug!("Created chunk workspace {}", temp_dir.path().display());

        Ok(Self {
            temp_dir: Some(temp_dir),
            files: Vec::new(),
            cleanup,
        })
    }

    /// Путь для аудио фрагмента; имя уникально, файл создает синтезатор
    pub fn chunk_path(&mut self, index: usize, extension: &str) -> PathBuf {
        let file_name = format!("chunk_{:03}_{}.{}", index, uuid::Uuid::new_v4(), extension);
        let file_path = self.path().join(file_name);
        self.files.push(file_path.clone());
        file_path
    }

    /// Пути всех выданных фрагментов в порядке выдачи
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn path(&self) -> &Path {
        match &self.temp_dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    /// Удалить файлы фрагментов
    pub fn cleanup(&mut self) -> Result<()> {
        if !self.cleanup {
            return Ok(());
        }
        for file in &self.files {
            if file.exists() {
                fs::remove_file(file)?;
            }
        }
        self.files.clear();
        Ok(())
    }
}

impl Drop for ChunkWorkspace {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Failed to remove chunk files: {}", e);
        }

        let Some(dir) = self.temp_dir.take() else {
            return;
        };
        if self.cleanup {
            if let Err(e) = dir.close() {
                warn!("Failed to remove chunk workspace: {}", e);
            }
        } else {
            let kept = dir.into_path();
            debug!("Keeping chunk workspace {}", kept.display());
        }
    }
}
