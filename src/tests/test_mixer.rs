use tempfile::tempdir;

use crate::error::DubSyncError;
use crate::media::audio_format::{decode_audio_file, encode_wav};
use crate::media::clip::AudioClip;
use crate::media::mixer::TrackMixer;

fn constant(value: f32, duration_ms: u64, sample_rate: u32, channels: u16) -> AudioClip {
    let frames = (duration_ms * sample_rate as u64 / 1000) as usize;
    AudioClip::new(vec![value; frames * channels as usize], sample_rate, channels).unwrap()
}

#[test]
fn test_output_follows_primary_when_background_is_longer() {
    let speech = constant(0.1, 2_000, 24_000, 1);
    let background = constant(0.2, 5_000, 24_000, 1);
    let mixed = TrackMixer::new(0.8).unwrap().mix(&speech, &background).unwrap();
    assert_eq!(mixed.frames(), speech.frames());
    assert!((mixed.samples()[100] - 0.26).abs() < 1e-6);
}

#[test]
fn test_output_follows_primary_when_background_is_shorter() {
    let speech = constant(0.1, 3_000, 24_000, 1);
    let background = constant(0.2, 1_000, 24_000, 1);
    let mixed = TrackMixer::new(1.0).unwrap().mix(&speech, &background).unwrap();
    assert_eq!(mixed.frames(), speech.frames());
    // после конца фона остаётся только речь
    assert!((mixed.samples()[12_000] - 0.3).abs() < 1e-6);
    assert!((mixed.samples()[60_000] - 0.1).abs() < 1e-6);
}

#[test]
fn test_mix_files_with_different_formats() {
    let dir = tempdir().unwrap();
    let speech = dir.path().join("speech.wav");
    let background = dir.path().join("no_vocals.wav");
    let output = dir.path().join("final.wav");

    encode_wav(&constant(0.25, 1_500, 24_000, 1), &speech).unwrap();
    encode_wav(&constant(0.1, 4_000, 44_100, 2), &background).unwrap();

    TrackMixer::new(0.8)
        .unwrap()
        .mix_files(&speech, &background, &output)
        .unwrap();

    let mixed = decode_audio_file(&output).unwrap();
    assert_eq!(mixed.sample_rate(), 24_000);
    assert_eq!(mixed.channels(), 1);
    assert_eq!(mixed.duration_ms(), 1_500);
    let middle = mixed.samples()[18_000];
    assert!((middle - 0.33).abs() < 0.01, "got {}", middle);
}

#[test]
fn test_unreadable_background_is_fatal() {
    let dir = tempdir().unwrap();
    let speech = dir.path().join("speech.wav");
    let background = dir.path().join("bg.wav");
    encode_wav(&constant(0.25, 500, 24_000, 1), &speech).unwrap();
    std::fs::write(&background, b"garbage").unwrap();

    let result = TrackMixer::new(0.8)
        .unwrap()
        .mix_files(&speech, &background, &dir.path().join("out.wav"));
    assert!(matches!(result, Err(DubSyncError::Mixing(_))));
}
