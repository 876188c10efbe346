// archiver_core/src/lib.rs

//! Incremental archiving of dated puzzle records.
//! Fetch windows, sources, archive stores and the bounded parallel controller
//! live here, together with the reporting computations over the archives.

pub mod job;
pub mod keys;
pub mod store;
pub mod utils;
pub mod series;
pub mod fetcher;
pub mod records;
pub mod sources;
pub mod cheating;
pub mod settings;
pub mod aggregate;
pub mod controller;
pub mod date_range;
pub mod file_names;
pub mod indicators;
