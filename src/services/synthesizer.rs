//! Синтез речи по сегментам.
//!
//! Модель синтеза внешняя: библиотека получает её как объект [`Synthesizer`],
//! которым владеет вызывающий код. Здесь только разбиение текста, вызовы по
//! фрагментам и склейка результата в `segment_{index}.wav`.

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::align::segment::Segment;
use crate::error::{DubSyncError, Result};
use crate::media::stitch::stitch_files;
use crate::text::segmenter::TextSegmenter;
use crate::utils::temp::ChunkWorkspace;

/// Запрос на синтез одного фрагмента текста
#[derive(Debug, Clone)]
pub struct SynthesisRequest<'a> {
    /// Текст не длиннее лимита синтезатора
    pub text: &'a str,
    /// Образец голоса
    pub speaker_wav: &'a Path,
    /// Код языка (например, "en")
    pub language: &'a str,
}

/// Синтезатор речи
pub trait Synthesizer: Send + Sync {
    /// Синтезирует фрагмент и записывает аудио в `output`
    fn synthesize(&self, request: &SynthesisRequest<'_>, output: &Path) -> Result<()>;
}

/// Результат синтеза набора сегментов
#[derive(Debug, Clone, Default)]
pub struct SynthesisSummary {
    /// Пары (индекс сегмента, путь к клипу)
    pub clips: Vec<(usize, PathBuf)>,
    /// Сегменты, синтез которых не удался
    pub failed: Vec<usize>,
    /// Сегменты без текста
    pub empty: Vec<usize>,
}

/// Синтез сегментов через внешний [`Synthesizer`]
pub struct SegmentSynthesizer<'a, S: Synthesizer + ?Sized> {
    synthesizer: &'a S,
    segmenter: TextSegmenter,
    cleanup: bool,
}

impl<'a, S: Synthesizer + ?Sized> SegmentSynthesizer<'a, S> {
    pub fn new(synthesizer: &'a S, segmenter: TextSegmenter, cleanup: bool) -> Self {
        Self {
            synthesizer,
            segmenter,
            cleanup,
        }
    }

    /// Синтезирует один сегмент в `output_dir/segment_{index}.wav`.
    ///
    /// Возвращает `None` для сегмента без текста. Ошибка любого фрагмента
    /// является ошибкой всего сегмента; временные файлы удаляются в любом случае.
    pub fn synthesize_segment(
        &self,
        segment: &Segment,
        speaker_wav: &Path,
        language: &str,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>> {
        ensure_speaker_wav(speaker_wav)?;

        let chunks = self.segmenter.split(&segment.text);
        if chunks.is_empty() {
            warn!("Segment {} has no text to synthesize", segment.index);
            return Ok(None);
        }

        let mut workspace = ChunkWorkspace::new(self.cleanup)?;
        for chunk in &chunks {
            let chunk_path = workspace.chunk_path(chunk.index, "wav");
            let request = SynthesisRequest {
                text: &chunk.text,
                speaker_wav,
                language,
            };
            self.synthesizer.synthesize(&request, &chunk_path).map_err(|e| {
                DubSyncError::Synthesis(format!(
                    "segment {} chunk {}: {}",
                    segment.index, chunk.index, e
                ))
            })?;
            if !chunk_path.exists() {
                return Err(DubSyncError::Synthesis(format!(
                    "segment {} chunk {}: synthesizer produced no audio",
                    segment.index, chunk.index
                )));
            }
            debug!(
                "Segment {} chunk {}/{} synthesized ({} chars)",
                segment.index,
                chunk.index + 1,
                chunks.len(),
                chunk.char_len()
            );
        }

        std::fs::create_dir_all(output_dir)?;
        let output = output_dir.join(segment.clip_file_name());
        stitch_files(workspace.files(), &output)?;
        Ok(Some(output))
    }

    /// Синтезирует все сегменты; неудачные сегменты логируются и пропускаются
    pub fn synthesize_all(
        &self,
        segments: &[Segment],
        speaker_wav: &Path,
        language: &str,
        output_dir: &Path,
    ) -> Result<SynthesisSummary> {
        ensure_speaker_wav(speaker_wav)?;
        info!(
            "Synthesizing {} segments into {} (language {})",
            segments.len(),
            output_dir.display(),
            language
        );

        let mut summary = SynthesisSummary::default();
        for segment in segments {
            match self.synthesize_segment(segment, speaker_wav, language, output_dir) {
                Ok(Some(path)) => summary.clips.push((segment.index, path)),
                Ok(None) => summary.empty.push(segment.index),
                Err(e) => {
                    error!("Segment {} synthesis failed: {}", segment.index, e);
                    summary.failed.push(segment.index);
                }
            }
        }

        info!(
            "Synthesis finished: {} clips, {} failed, {} empty",
            summary.clips.len(),
            summary.failed.len(),
            summary.empty.len()
        );
        Ok(summary)
    }
}

fn ensure_speaker_wav(speaker_wav: &Path) -> Result<()> {
    if !speaker_wav.exists() {
        return Err(DubSyncError::FileNotFound(format!(
            "Speaker reference {} not found",
            speaker_wav.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::audio_format::{decode_audio_file, encode_wav};
    use crate::media::clip::AudioClip;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Пишет 10 мс тишины на каждый символ и запоминает тексты
    struct FakeSynth {
        texts: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl FakeSynth {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                texts: Mutex::new(Vec::new()),
                fail_on,
            }
        }
    }

    impl Synthesizer for FakeSynth {
        fn synthesize(&self, request: &SynthesisRequest<'_>, output: &Path) -> Result<()> {
            if let Some(word) = self.fail_on {
                if request.text.contains(word) {
                    return Err(DubSyncError::Synthesis("model crashed".to_string()));
                }
            }
            self.texts.lock().unwrap().push(request.text.to_string());
            let ms = request.text.chars().count() as u64 * 10;
            encode_wav(&AudioClip::silent(ms, 8_000, 1)?, output)
        }
    }

    fn speaker(dir: &Path) -> PathBuf {
        let path = dir.join("speaker.wav");
        encode_wav(&AudioClip::silent(100, 8_000, 1).unwrap(), &path).unwrap();
        path
    }

    #[test]
    fn test_chunks_are_stitched_in_order() {
        let dir = tempdir().unwrap();
        let speaker = speaker(dir.path());
        let synth = FakeSynth::new(None);
        let driver = SegmentSynthesizer::new(&synth, TextSegmenter::new(12), true);
        let segment = Segment::new(4, 0, 5_000, "Hello there. How are you?").unwrap();

        let clip = driver
            .synthesize_segment(&segment, &speaker, "en", dir.path())
            .unwrap()
            .unwrap();

        assert!(clip.ends_with("segment_4.wav"));
        assert_eq!(*synth.texts.lock().unwrap(), vec!["Hello there.", "How are you?"]);
        assert_eq!(decode_audio_file(&clip).unwrap().duration_ms(), 240);
    }

    #[test]
    fn test_failed_segment_is_skipped() {
        let dir = tempdir().unwrap();
        let speaker = speaker(dir.path());
        let synth = FakeSynth::new(Some("broken"));
        let driver = SegmentSynthesizer::new(&synth, TextSegmenter::new(250), true);
        let segments = vec![
            Segment::new(0, 0, 1_000, "fine").unwrap(),
            Segment::new(1, 1_000, 2_000, "broken").unwrap(),
            Segment::new(2, 2_000, 3_000, "   ").unwrap(),
        ];

        let summary = driver
            .synthesize_all(&segments, &speaker, "en", dir.path())
            .unwrap();
        assert_eq!(summary.clips.len(), 1);
        assert_eq!(summary.failed, vec![1]);
        assert_eq!(summary.empty, vec![2]);
        assert!(!dir.path().join("segment_1.wav").exists());
    }

    #[test]
    fn test_missing_speaker_is_fatal() {
        let dir = tempdir().unwrap();
        let synth = FakeSynth::new(None);
        let driver = SegmentSynthesizer::new(&synth, TextSegmenter::new(250), true);
        let result = driver.synthesize_all(
            &[Segment::new(0, 0, 1_000, "hi").unwrap()],
            &dir.path().join("nobody.wav"),
            "en",
            dir.path(),
        );
        assert!(matches!(result, Err(DubSyncError::FileNotFound(_))));
        assert!(synth.texts.lock().unwrap().is_empty());
    }
}
