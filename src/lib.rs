//! Основной файл библиотеки dub-sync
//!
//! Библиотека подгоняет синтезированную речь под временную шкалу исходного видео
//! и сводит её с фоновой дорожкой. Модели распознавания, перевода, синтеза и
//! разделения источников внешние и передаются в библиотеку как объекты.

pub mod align;
pub mod config;
pub mod error;
pub mod logger;
pub mod media;
pub mod services;
pub mod text;
pub mod utils;

use std::path::{Path, PathBuf};

use log::{info, warn};

pub use crate::align::{AlignmentReport, Canvas, Segment, TimingAligner};
pub use crate::config::DubSyncConfig;
pub use crate::error::{DubSyncError, Result};
pub use crate::media::{AudioClip, RateAdjuster, TrackMixer};
pub use crate::services::{SeparatedTracks, SourceSeparator, SynthesisSummary, Synthesizer};
pub use crate::text::{Chunk, TextSegmenter};

use crate::media::audio_format::probe_duration_ms;
use crate::services::{separate_checked, SegmentSynthesizer};

/// Входные данные полного прохода дубляжа
#[derive(Debug, Clone)]
pub struct DubbingJob {
    /// Исходная аудиодорожка видео
    pub source_audio: PathBuf,
    /// Файл, по которому определяется длительность холста (обычно само видео).
    /// Если не задан, используется `source_audio`.
    pub host_media: Option<PathBuf>,
    /// Сегменты с уже переведенным текстом
    pub segments: Vec<Segment>,
    /// Образец голоса; по умолчанию исходная дорожка
    pub speaker_wav: Option<PathBuf>,
    /// Язык синтеза
    pub language: String,
    /// Рабочая директория для промежуточных и итоговых файлов
    pub work_dir: PathBuf,
}

/// Итог полного прохода дубляжа
#[derive(Debug, Clone)]
pub struct DubbingReport {
    pub separated: SeparatedTracks,
    pub synthesis: SynthesisSummary,
    pub alignment: AlignmentReport,
    /// Речевая дорожка без фона
    pub speech_track: PathBuf,
    /// Итоговое сведение
    pub final_mix: PathBuf,
}

/// Основная структура для работы с библиотекой
#[derive(Debug, Clone, Default)]
pub struct DubSync {
    config: DubSyncConfig,
}

impl DubSync {
    /// Создать экземпляр с проверенной конфигурацией
    pub fn new(config: DubSyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DubSyncConfig {
        &self.config
    }

    pub fn segmenter(&self) -> TextSegmenter {
        TextSegmenter::new(self.config.segmenter.max_chars)
    }

    pub fn aligner(&self) -> TimingAligner {
        TimingAligner::from_config(&self.config)
    }

    pub fn mixer(&self) -> Result<TrackMixer> {
        TrackMixer::new(self.config.mix.background_gain)
    }

    /// Синтезирует клипы сегментов в `clips_dir`
    pub fn synthesize_segments<S: Synthesizer + ?Sized>(
        &self,
        synthesizer: &S,
        segments: &[Segment],
        speaker_wav: &Path,
        language: &str,
        clips_dir: &Path,
    ) -> Result<SynthesisSummary> {
        SegmentSynthesizer::new(synthesizer, self.segmenter(), self.config.cleanup_temp_files)
            .synthesize_all(segments, speaker_wav, language, clips_dir)
    }

    /// Собирает речевую дорожку из клипов `clips_dir`.
    ///
    /// Длительность холста берется из `host_media`; если её не удалось определить,
    /// холст строится по концу последнего сегмента.
    pub fn render_speech_track(
        &self,
        segments: &[Segment],
        clips_dir: &Path,
        host_media: Option<&Path>,
        output: &Path,
    ) -> Result<AlignmentReport> {
        let host_duration_ms = host_media.and_then(|media| match probe_duration_ms(media) {
            Ok(ms) => Some(ms),
            Err(e) => {
                warn!(
                    "Could not read duration of {} ({}), sizing canvas from segments",
                    media.display(),
                    e
                );
                None
            }
        });

        self.aligner()
            .align_directory(segments, clips_dir, host_duration_ms, output)
    }

    /// Сводит речь с фоном; длительность результата равна длительности речи
    pub fn mix_tracks(&self, speech: &Path, background: &Path, output: &Path) -> Result<()> {
        self.mixer()?.mix_files(speech, background, output)
    }

    /// Полный проход: разделение, синтез, выравнивание, сведение
    pub fn dub_audio<Sep, Syn>(&self, separator: &Sep, synthesizer: &Syn, job: &DubbingJob) -> Result<DubbingReport>
    where
        Sep: SourceSeparator + ?Sized,
        Syn: Synthesizer + ?Sized,
    {
        info!(
            "Starting dubbing of {} ({} segments)",
            job.source_audio.display(),
            job.segments.len()
        );
        std::fs::create_dir_all(&job.work_dir)?;

        let separated = separate_checked(separator, &job.source_audio, &job.work_dir.join("separated"))?;

        let speaker_wav = job.speaker_wav.as_deref().unwrap_or(job.source_audio.as_path());
        let clips_dir = job.work_dir.join("tts_clips");
        let synthesis =
            self.synthesize_segments(synthesizer, &job.segments, speaker_wav, &job.language, &clips_dir)?;

        let speech_track = job.work_dir.join("aligned_speech_clean.wav");
        let host_media = job.host_media.as_deref().unwrap_or(job.source_audio.as_path());
        let alignment = self.render_speech_track(&job.segments, &clips_dir, Some(host_media), &speech_track)?;

        let final_mix = job.work_dir.join("final_dubbed_audio.wav");
        self.mix_tracks(&speech_track, &separated.accompaniment, &final_mix)?;

        info!("Dubbing complete: {}", final_mix.display());
        Ok(DubbingReport {
            separated,
            synthesis,
            alignment,
            speech_track,
            final_mix,
        })
    }
}
