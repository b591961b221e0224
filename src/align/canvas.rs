//! Холст речевой дорожки.
//!
//! Холст имеет фиксированную длительность и собирается наложением клипов по
//! абсолютным смещениям. Перекрывающиеся клипы суммируются, всё, что выходит
//! за конец холста, отбрасывается.

use std::path::Path;

use log::{debug, info, warn};

use crate::align::segment::{timeline_end_ms, Segment};
use crate::error::Result;
use crate::media::audio_format::encode_wav;
use crate::media::clip::{frames_to_ms, ms_to_frames, AudioClip};
use crate::media::rate::resample;

/// Буфер итоговой речевой дорожки
#[derive(Debug, Clone)]
pub struct Canvas {
    buffer: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl Canvas {
    /// Тихий холст заданной длительности
    pub fn new(duration_ms: u64, sample_rate: u32, channels: u16) -> Result<Self> {
        let silent = AudioClip::silent(duration_ms, sample_rate, channels)?;
        Ok(Self {
            buffer: silent.into_samples(),
            sample_rate,
            channels,
        })
    }

    /// Холст для временной шкалы.
    ///
    /// Длительность берется из исходного видео, если она известна, иначе из конца
    /// последнего сегмента плюс `margin_ms`. В обоих случаях холст не короче
    /// самого позднего конца сегмента.
    pub fn for_timeline(
        host_duration_ms: Option<u64>,
        segments: &[Segment],
        margin_ms: u64,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self> {
        let last_end = timeline_end_ms(segments);
        let duration_ms = match host_duration_ms {
            Some(host) if host < last_end => {
                warn!(
                    "Host duration {} ms is shorter than the last segment end {} ms, extending canvas",
                    host, last_end
                );
                last_end
            }
            Some(host) => host,
            None => last_end + margin_ms,
        };

        info!(
            "Creating canvas of {} ms ({} Hz, {} ch) for {} segments",
            duration_ms,
            sample_rate,
            channels,
            segments.len()
        );
        Self::new(duration_ms, sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.buffer.len() / self.channels as usize
    }

    pub fn duration_ms(&self) -> u64 {
        frames_to_ms(self.frames(), self.sample_rate)
    }

    /// Накладывает клип начиная с `offset_ms`.
    ///
    /// Клип приводится к формату холста, семплы суммируются. Возвращает число
    /// реально записанных кадров.
    pub fn overlay(&mut self, clip: &AudioClip, offset_ms: u64) -> Result<usize> {
        let converted;
        let clip = if clip.sample_rate() != self.sample_rate || clip.channels() != self.channels {
            debug!(
                "Converting clip {} Hz/{} ch to canvas format {} Hz/{} ch",
                clip.sample_rate(),
                clip.channels(),
                self.sample_rate,
                self.channels
            );
            converted = resample(clip, self.sample_rate).to_channels(self.channels)?;
            &converted
        } else {
            clip
        };

        let ch = self.channels as usize;
        let total = self.frames();
        let start = ms_to_frames(offset_ms, self.sample_rate).min(total);
        let available = total - start;
        let written = clip.frames().min(available);
        if written < clip.frames() {
            warn!(
                "Clip at {} ms runs past the canvas end, dropping {} frames",
                offset_ms,
                clip.frames() - written
            );
        }

        let target = &mut self.buffer[start * ch..(start + written) * ch];
        for (dst, src) in target.iter_mut().zip(clip.samples()) {
            *dst += *src;
        }
        Ok(written)
    }

    /// Холст как обычный клип
    pub fn into_clip(self) -> Result<AudioClip> {
        AudioClip::new(self.buffer, self.sample_rate, self.channels)
    }

    /// Пиковая амплитуда; больше 1.0 значит, что при записи будет клиппинг
    pub fn peak(&self) -> f32 {
        self.buffer.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// Записывает холст в WAV (16 бит PCM)
    pub fn export_wav(&self, path: &Path) -> Result<()> {
        let clip = AudioClip::new(self.buffer.clone(), self.sample_rate, self.channels)?;
        encode_wav(&clip, path)?;
        info!("Speech track saved to {} ({} ms)", path.display(), clip.duration_ms());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(index: usize, start_ms: u64, end_ms: u64) -> Segment {
        Segment::new(index, start_ms, end_ms, "text").unwrap()
    }

    #[test]
    fn test_duration_from_segments_plus_margin() {
        let segments = vec![seg(0, 0, 1_000), seg(1, 1_500, 4_000)];
        let canvas = Canvas::for_timeline(None, &segments, 2_000, 1_000, 1).unwrap();
        assert_eq!(canvas.duration_ms(), 6_000);
    }

    #[test]
    fn test_host_duration_wins_but_covers_segments() {
        let segments = vec![seg(0, 0, 4_000)];
        let canvas = Canvas::for_timeline(Some(10_000), &segments, 2_000, 1_000, 1).unwrap();
        assert_eq!(canvas.duration_ms(), 10_000);

        let short = Canvas::for_timeline(Some(3_000), &segments, 2_000, 1_000, 1).unwrap();
        assert_eq!(short.duration_ms(), 4_000);
    }

    #[test]
    fn test_overlay_is_additive() {
        let mut canvas = Canvas::new(100, 1_000, 1).unwrap();
        let clip = AudioClip::mono(vec![0.25; 20], 1_000).unwrap();
        canvas.overlay(&clip, 10).unwrap();
        canvas.overlay(&clip, 20).unwrap();

        let out = canvas.into_clip().unwrap();
        assert_eq!(out.samples()[9], 0.0);
        assert_eq!(out.samples()[15], 0.25);
        assert_eq!(out.samples()[25], 0.5);
        assert_eq!(out.samples()[35], 0.25);
        assert_eq!(out.samples()[40], 0.0);
    }

    #[test]
    fn test_overlay_truncates_at_canvas_end() {
        let mut canvas = Canvas::new(50, 1_000, 1).unwrap();
        let clip = AudioClip::mono(vec![0.1; 30], 1_000).unwrap();
        assert_eq!(canvas.overlay(&clip, 40).unwrap(), 10);
        assert_eq!(canvas.overlay(&clip, 80).unwrap(), 0);
        assert_eq!(canvas.frames(), 50);
    }

    #[test]
    fn test_overlay_converts_channels() {
        let mut canvas = Canvas::new(10, 1_000, 2).unwrap();
        let clip = AudioClip::mono(vec![0.5; 5], 1_000).unwrap();
        canvas.overlay(&clip, 0).unwrap();
        let out = canvas.into_clip().unwrap();
        assert_eq!(&out.samples()[..4], &[0.5, 0.5, 0.5, 0.5]);
        assert_eq!(out.samples()[10], 0.0);
    }
}
