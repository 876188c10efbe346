// archiver_core/src/sources/mod.rs

//! Concrete data sources: how each provider is fetched and how its records
//! are laid out on disk.

pub mod wordle;
pub mod spelling_bee;
