// sectionmatch: place candidate links into newsletter sections by
// embedding similarity.
//
// This is the library root. Each module corresponds to one stage or
// surface of the pipeline.

pub mod config;
pub mod db;
pub mod fingerprint;
pub mod ingest;
pub mod inspect;
pub mod matching;
pub mod output;
pub mod pipeline;
pub mod status;
pub mod summarize;

#[cfg(feature = "web")]
pub mod web;
