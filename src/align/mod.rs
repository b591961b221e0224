//! Модуль синхронизации речи с временной шкалой видео

pub mod aligner;
pub mod canvas;
pub mod segment;

pub use aligner::{AlignmentReport, Placement, PlacementPlan, TimingAligner};
pub use canvas::Canvas;
pub use segment::{load_segments_json, parse_segments_json, Segment};
