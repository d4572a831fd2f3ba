//! Builds one artist record out of MusicBrainz, the Cover Art Archive and
//! Wikipedia, and serves it over HTTP.

pub mod api;
pub mod config;
pub mod documents;
pub mod endpoints;
pub mod engine;
pub mod errors;
pub mod metrics_defs;
pub mod types;

#[cfg(test)]
mod testutils;

pub use engine::AggregationEngine;
pub use errors::BuildError;
pub use types::{AlbumRecord, ArtistRecord};
