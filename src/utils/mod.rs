//! Вспомогательные модули

pub mod temp;

pub use temp::ChunkWorkspace;
