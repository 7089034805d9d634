//! Geo index backends.
mod memory_index;

pub use memory_index::InMemoryGeoIndex;
