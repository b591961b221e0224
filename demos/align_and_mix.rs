//! Сборка дубляжа из готовых клипов.
//!
//! ```text
//! cargo run --example align_and_mix -- segments.json tts_clips/ no_vocals.wav out/ [video.mp4] [config.json]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use dub_sync::align::load_segments_json;
use dub_sync::logger::init_logger;
use dub_sync::{DubSync, DubSyncConfig};

fn main() -> Result<()> {
    init_logger();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 4 {
        bail!("usage: align_and_mix <segments.json> <clips_dir> <background> <output_dir> [host_media] [config.json]");
    }

    let segments = load_segments_json(&args[0]).context("reading segments")?;
    let clips_dir = Path::new(&args[1]);
    let background = Path::new(&args[2]);
    let output_dir = PathBuf::from(&args[3]);
    let host_media = args.get(4).map(PathBuf::from);
    let config = match args.get(5) {
        Some(path) => DubSyncConfig::from_json_file(path)?,
        None => DubSyncConfig::default(),
    };

    std::fs::create_dir_all(&output_dir)?;
    let dub = DubSync::new(config)?;

    let speech = output_dir.join("aligned_speech_clean.wav");
    let report = dub.render_speech_track(&segments, clips_dir, host_media.as_deref(), &speech)?;
    println!(
        "placed {} segments ({} sped up), skipped {:?}",
        report.placements.len(),
        report.speed_corrected(),
        report.skipped
    );

    let final_mix = output_dir.join("final_dubbed_audio.wav");
    dub.mix_tracks(&speech, background, &final_mix)?;
    println!("{}", final_mix.display());
    Ok(())
}
