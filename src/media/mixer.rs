//! Сведение речевой дорожки с фоном.
//!
//! Длительность результата всегда равна длительности речевой дорожки: фон
//! обрезается или дополняется тишиной. Громкость меняется только у фона.

use std::path::Path;

use log::{debug, error, info};

use crate::error::{DubSyncError, Result};
use crate::media::audio_format::{decode_audio_file, encode_wav};
use crate::media::clip::AudioClip;
use crate::media::rate::resample;

/// Микшер двух дорожек с усилением фона
#[derive(Debug, Clone)]
pub struct TrackMixer {
    background_gain: f32,
}

impl TrackMixer {
    /// Отрицательное или нечисловое усиление отклоняется
    pub fn new(background_gain: f32) -> Result<Self> {
        if !background_gain.is_finite() || background_gain < 0.0 {
            return Err(DubSyncError::Configuration(format!(
                "background gain must be a non-negative number, got {}",
                background_gain
            )));
        }
        Ok(Self { background_gain })
    }

    pub fn background_gain(&self) -> f32 {
        self.background_gain
    }

    /// Смешивает фон с речью в формате и длине речевой дорожки
    pub fn mix(&self, primary: &AudioClip, secondary: &AudioClip) -> Result<AudioClip> {
        let background = if secondary.sample_rate() != primary.sample_rate() {
            debug!(
                "Resampling background {} Hz -> {} Hz",
                secondary.sample_rate(),
                primary.sample_rate()
            );
            resample(secondary, primary.sample_rate())
        } else {
            secondary.clone()
        };
        let background = background
            .to_channels(primary.channels())?
            .with_frames(primary.frames());

        let mixed: Vec<f32> = primary
            .samples()
            .iter()
            .zip(background.samples())
            .map(|(speech, bg)| speech + bg * self.background_gain)
            .collect();

        AudioClip::new(mixed, primary.sample_rate(), primary.channels())
    }

    /// Сводит два файла в `output`. Любая ошибка фатальна.
    pub fn mix_files(&self, speech: &Path, background: &Path, output: &Path) -> Result<()> {
        info!(
            "Mixing {} with {} (background gain {:.2})",
            speech.display(),
            background.display(),
            self.background_gain
        );

        let result = (|| -> Result<()> {
            let primary = decode_audio_file(speech)?;
            let secondary = decode_audio_file(background)?;
            let mixed = self.mix(&primary, &secondary)?;
            encode_wav(&mixed, output)
        })();

        result.map_err(|e| {
            error!("Mixing failed: {}", e);
            DubSyncError::Mixing(e.to_string())
        })?;

        info!("Mixed audio saved to {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_applies_to_background_only() {
        let speech = AudioClip::mono(vec![0.5; 4], 8_000).unwrap();
        let background = AudioClip::mono(vec![0.5; 4], 8_000).unwrap();
        let mixed = TrackMixer::new(0.5).unwrap().mix(&speech, &background).unwrap();
        assert!(mixed.samples().iter().all(|s| (s - 0.75).abs() < 1e-6));

        let silent_bg = TrackMixer::new(0.0).unwrap().mix(&speech, &background).unwrap();
        assert_eq!(silent_bg.samples(), speech.samples());
    }

    #[test]
    fn test_background_is_converted_to_speech_layout() {
        let speech = AudioClip::mono(vec![0.0; 100], 8_000).unwrap();
        let background = AudioClip::new(vec![0.2, 0.4].repeat(100), 8_000, 2).unwrap();
        let mixed = TrackMixer::new(1.0).unwrap().mix(&speech, &background).unwrap();
        assert_eq!(mixed.channels(), 1);
        assert!((mixed.samples()[10] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_negative_gain() {
        assert!(TrackMixer::new(-0.1).is_err());
        assert!(TrackMixer::new(f32::NAN).is_err());
    }

    #[test]
    fn test_missing_input_is_mixing_error() {
        let dir = tempfile::tempdir().unwrap();
        let mixer = TrackMixer::new(0.8).unwrap();
        let result = mixer.mix_files(
            &dir.path().join("speech.wav"),
            &dir.path().join("bg.wav"),
            &dir.path().join("out.wav"),
        );
        assert!(matches!(result, Err(DubSyncError::Mixing(_))));
    }
}
