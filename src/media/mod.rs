//! Модуль для работы с аудио
//!
//! Клипы, чтение и запись файлов, изменение скорости, склейка и сведение.

pub mod audio_format;
pub mod clip;
pub mod mixer;
pub mod rate;
pub mod stitch;

pub use audio_format::{decode_audio_file, encode_wav, probe_duration_ms};
pub use clip::AudioClip;
pub use mixer::TrackMixer;
pub use rate::{resample, RateAdjuster};
pub use stitch::{stitch_clips, stitch_files};
