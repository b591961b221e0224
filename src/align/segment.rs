//! Сегменты временной шкалы исходного видео.

use std::path::Path;

use serde::Deserialize;

use crate::error::{DubSyncError, Result};

/// Сегмент с текстом и слотом `[start_ms, end_ms)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Позиция во временном порядке (с нуля)
    pub index: usize,
    /// Начало слота, мс
    pub start_ms: u64,
    /// Конец слота, мс
    pub end_ms: u64,
    /// Текст сегмента
    pub text: String,
}

impl Segment {
    /// Создать сегмент; пустой или перевернутый слот отклоняется
    pub fn new(index: usize, start_ms: u64, end_ms: u64, text: impl Into<String>) -> Result<Self> {
        if end_ms <= start_ms {
            return Err(DubSyncError::InvalidSegment(format!(
                "segment {} ends at {} ms, not after its start at {} ms",
                index, end_ms, start_ms
            )));
        }
        Ok(Self {
            index,
            start_ms,
            end_ms,
            text: text.into(),
        })
    }

    /// Длительность слота, мс
    pub fn slot_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    /// Имя файла с синтезированной речью для сегмента
    pub fn clip_file_name(&self) -> String {
        format!("segment_{}.wav", self.index)
    }
}

/// Запись сегмента в формате Whisper (время в секундах)
#[derive(Debug, Deserialize)]
struct RawSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
}

/// Разбирает JSON-массив сегментов Whisper: `[{"start": 0.0, "end": 2.5, "text": "..."}]`.
///
/// Время переводится в миллисекунды с отбрасыванием дробной части,
/// индекс сегмента равен его позиции в массиве.
pub fn parse_segments_json(json: &str) -> Result<Vec<Segment>> {
    let raw: Vec<RawSegment> = serde_json::from_str(json)?;
    raw.into_iter()
        .enumerate()
        .map(|(index, seg)| {
            if !seg.start.is_finite() || !seg.end.is_finite() || seg.start < 0.0 {
                return Err(DubSyncError::InvalidSegment(format!(
                    "segment {} has invalid times {}..{}",
                    index, seg.start, seg.end
                )));
            }
            let start_ms = (seg.start * 1000.0) as u64;
            let end_ms = (seg.end * 1000.0) as u64;
            Segment::new(index, start_ms, end_ms, seg.text.trim())
        })
        .collect()
}

/// Читает сегменты из JSON-файла
pub fn load_segments_json<P: AsRef<Path>>(path: P) -> Result<Vec<Segment>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        DubSyncError::FileNotFound(format!("Failed to open segments file {}: {}", path.display(), e))
    })?;
    let segments = parse_segments_json(&raw)?;
    log::info!("Loaded {} segments from {}", segments.len(), path.display());
    Ok(segments)
}

/// Конец последнего по времени сегмента
pub fn timeline_end_ms(segments: &[Segment]) -> u64 {
    segments.iter().map(|s| s.end_ms).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whisper_segments() {
        let json = r#"[
            {"id": 0, "seek": 0, "start": 0.0, "end": 2.5, "text": " Hallo zusammen.", "tokens": [1, 2]},
            {"id": 1, "start": 2.5, "end": 4.0019, "text": "Wie geht's?"}
        ]"#;

        let segments = parse_segments_json(json).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hallo zusammen.");
        assert_eq!(segments[0].slot_ms(), 2_500);
        assert_eq!(segments[1].index, 1);
        assert_eq!(segments[1].start_ms, 2_500);
        assert_eq!(segments[1].end_ms, 4_001);
        assert_eq!(segments[1].clip_file_name(), "segment_1.wav");
        assert_eq!(timeline_end_ms(&segments), 4_001);
    }

    #[test]
    fn test_empty_slot_is_rejected() {
        assert!(matches!(
            Segment::new(3, 1_000, 1_000, "x"),
            Err(DubSyncError::InvalidSegment(_))
        ));
        let json = r#"[{"start": 3.0, "end": 2.0, "text": "backwards"}]"#;
        assert!(parse_segments_json(json).is_err());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            parse_segments_json("{not json"),
            Err(DubSyncError::Json(_))
        ));
        assert_eq!(timeline_end_ms(&[]), 0);
    }
}
