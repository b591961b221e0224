//! Внешние модели: синтез речи и разделение источников.
//!
//! Обе модели передаются в библиотеку как объекты, которыми владеет вызывающий код.

pub mod separator;
pub mod synthesizer;

pub use separator::{separate_checked, SeparatedTracks, SourceSeparator};
pub use synthesizer::{SegmentSynthesizer, SynthesisRequest, SynthesisSummary, Synthesizer};
