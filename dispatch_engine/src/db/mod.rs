//! Storage backends for the dispatch engine.
#[cfg(feature = "sqlite")]
pub mod sqlite;
