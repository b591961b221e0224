//! Выравнивание синтезированной речи по слотам сегментов.
//!
//! Для каждого сегмента по порядку:
//! 1. сравнивается длительность клипа с длительностью слота;
//! 2. если клип длиннее слота больше чем на порог, он ускоряется, но не
//!    сильнее `max_speedup`, остаток рассинхронизации принимается;
//! 3. свободное время (slack) распределяется: первый сегмент прижимается к концу
//!    слота с отступом, остальные центрируются, не влезающие ставятся в начало;
//! 4. смещение ограничивается нулем, клип накладывается на холст.
//!
//! Сегменты без клипа пропускаются, проход продолжается.

use std::path::Path;

use log::{debug, info, warn};

use crate::align::canvas::Canvas;
use crate::align::segment::Segment;
use crate::config::{AlignmentConfig, DubSyncConfig, OutputFormat};
use crate::error::Result;
use crate::media::audio_format::decode_audio_file;
use crate::media::clip::AudioClip;
use crate::media::rate::RateAdjuster;

/// Решение по одному сегменту, рассчитанное до изменения клипа
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementPlan {
    pub segment_index: usize,
    pub slot_ms: u64,
    pub clip_ms: u64,
    /// clip_ms / slot_ms
    pub ratio: f64,
    /// Множитель скорости, если нужна коррекция
    pub multiplier: Option<f64>,
    /// Ожидаемая длительность после коррекции
    pub expected_clip_ms: u64,
    pub slack_ms: i64,
    pub offset_ms: u64,
}

/// Фактическое размещение клипа на холсте
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub segment_index: usize,
    pub offset_ms: u64,
    pub original_ms: u64,
    pub final_ms: u64,
    pub multiplier: Option<f64>,
    pub slack_ms: i64,
}

impl Placement {
    /// Клип так и не уложился в слот (ускорение упёрлось в предел)
    pub fn overruns(&self) -> bool {
        self.slack_ms < 0
    }
}

/// Итог прохода выравнивания
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentReport {
    pub placements: Vec<Placement>,
    /// Индексы сегментов, для которых не нашлось клипа
    pub skipped: Vec<usize>,
}

impl AlignmentReport {
    pub fn speed_corrected(&self) -> usize {
        self.placements.iter().filter(|p| p.multiplier.is_some()).count()
    }

    pub fn overrunning(&self) -> usize {
        self.placements.iter().filter(|p| p.overruns()).count()
    }
}

/// Выравниватель клипов по временной шкале
#[derive(Debug, Clone)]
pub struct TimingAligner {
    config: AlignmentConfig,
    rate: RateAdjuster,
    output: OutputFormat,
}

impl TimingAligner {
    pub fn new(config: AlignmentConfig, rate: RateAdjuster) -> Self {
        Self {
            config,
            rate,
            output: OutputFormat::default(),
        }
    }

    /// Выравниватель с параметрами из общей конфигурации
    pub fn from_config(config: &DubSyncConfig) -> Self {
        Self::new(config.alignment.clone(), RateAdjuster::new(config.rate.clone()))
            .with_output(config.output.clone())
    }

    /// Формат холста для [`TimingAligner::align_directory`]
    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Множитель ускорения для отношения длительностей, если коррекция нужна
    pub fn speed_multiplier(&self, ratio: f64) -> Option<f64> {
        if ratio > self.config.speedup_threshold {
            Some(ratio.min(self.config.max_speedup))
        } else {
            None
        }
    }

    /// Смещение клипа длительностью `clip_ms` внутри слота сегмента
    pub fn placement_offset(&self, segment: &Segment, clip_ms: u64) -> (i64, u64) {
        let start = segment.start_ms as i64;
        let slack = segment.slot_ms() as i64 - clip_ms as i64;

        let offset = if slack > 0 && segment.index == 0 {
            start + slack - self.config.intro_tail_buffer_ms
        } else if slack > 0 {
            start + slack / 2
        } else {
            start
        };

        if offset < 0 {
            debug!(
                "Segment {} placement {} ms is negative, clamped to 0",
                segment.index, offset
            );
        }
        (slack, offset.max(0) as u64)
    }

    /// Решение по сегменту без изменения клипа
    pub fn plan(&self, segment: &Segment, clip_ms: u64) -> PlacementPlan {
        let slot_ms = segment.slot_ms();
        let ratio = clip_ms as f64 / slot_ms as f64;
        let multiplier = self.speed_multiplier(ratio);
        let expected_clip_ms = match multiplier {
            Some(m) => (clip_ms as f64 / m).round() as u64,
            None => clip_ms,
        };
        let (slack_ms, offset_ms) = self.placement_offset(segment, expected_clip_ms);

        PlacementPlan {
            segment_index: segment.index,
            slot_ms,
            clip_ms,
            ratio,
            multiplier,
            expected_clip_ms,
            slack_ms,
            offset_ms,
        }
    }

    /// Корректирует скорость клипа и накладывает его на холст
    pub fn place(&self, canvas: &mut Canvas, segment: &Segment, clip: &AudioClip) -> Result<Placement> {
        let original_ms = clip.duration_ms();
        let plan = self.plan(segment, original_ms);

        let adjusted;
        let clip = match plan.multiplier {
            Some(multiplier) => {
                info!(
                    "Segment {}: clip {} ms overruns slot {} ms (ratio {:.3}), speeding up x{:.3}",
                    segment.index, original_ms, plan.slot_ms, plan.ratio, multiplier
                );
                adjusted = self.rate.change_speed(clip, multiplier);
                &adjusted
            }
            None => clip,
        };

        // Длительность пересчитывается по фактическому клипу: частота могла быть ограничена
        let final_ms = clip.duration_ms();
        let (slack_ms, offset_ms) = self.placement_offset(segment, final_ms);
        if slack_ms < 0 {
            warn!(
                "Segment {}: clip still overruns its slot by {} ms after correction",
                segment.index, -slack_ms
            );
        }

        canvas.overlay(clip, offset_ms)?;
        debug!(
            "Segment {} [{}..{}) placed at {} ms ({} ms, slack {} ms)",
            segment.index, segment.start_ms, segment.end_ms, offset_ms, final_ms, slack_ms
        );

        Ok(Placement {
            segment_index: segment.index,
            offset_ms,
            original_ms,
            final_ms,
            multiplier: plan.multiplier,
            slack_ms,
        })
    }

    /// Проход по всем сегментам в порядке индексов.
    ///
    /// `clip_source` возвращает `Ok(None)`, если клипа нет (сегмент пропускается),
    /// и ошибку, если клип есть, но прочитать его нельзя (проход прерывается).
    pub fn align<F>(&self, canvas: &mut Canvas, segments: &[Segment], mut clip_source: F) -> Result<AlignmentReport>
    where
        F: FnMut(&Segment) -> Result<Option<AudioClip>>,
    {
        let mut ordered: Vec<&Segment> = segments.iter().collect();
        ordered.sort_by_key(|s| s.index);

        let mut report = AlignmentReport::default();
        for segment in ordered {
            match clip_source(segment)? {
                Some(clip) => report.placements.push(self.place(canvas, segment, &clip)?),
                None => {
                    warn!("Segment {}: no synthesized clip, skipping", segment.index);
                    report.skipped.push(segment.index);
                }
            }
        }

        info!(
            "Alignment finished: {} placed ({} sped up, {} overrunning), {} skipped",
            report.placements.len(),
            report.speed_corrected(),
            report.overrunning(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Собирает речевую дорожку из клипов `clips_dir/segment_{index}.wav` и пишет её в `output`
    pub fn align_directory(
        &self,
        segments: &[Segment],
        clips_dir: &Path,
        host_duration_ms: Option<u64>,
        output: &Path,
    ) -> Result<AlignmentReport> {
        let mut canvas = Canvas::for_timeline(
            host_duration_ms,
            segments,
            self.config.canvas_margin_ms,
            self.output.sample_rate,
            self.output.channels,
        )?;

        let report = self.align(&mut canvas, segments, |segment| {
            let path = clips_dir.join(segment.clip_file_name());
            if !path.exists() {
                return Ok(None);
            }
            decode_audio_file(&path).map(Some)
        })?;

        canvas.export_wav(output)?;
        Ok(report)
    }
}

impl Default for TimingAligner {
    fn default() -> Self {
        Self::new(AlignmentConfig::default(), RateAdjuster::default())
    }
}
