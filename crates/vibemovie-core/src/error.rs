//! Error types for VibeMovie storage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// The only failure a store reports. "Not found" and "no data" are modeled as
/// `None` / empty results, never as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(details: impl std::fmt::Display) -> Self {
        StoreError::Unavailable(details.to_string())
    }
}
