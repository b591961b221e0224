//! Модуль подготовки текста к синтезу речи

pub mod segmenter;

pub use segmenter::{normalize_whitespace, split_text, Chunk, TextSegmenter};
