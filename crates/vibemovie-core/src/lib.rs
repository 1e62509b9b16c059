//! VibeMovie Core Library
//!
//! Error types and the storage port shared by every backend.

// Re-export pure types from vibemovie-types
pub use vibemovie_types::*;

pub mod error;
pub mod ports;

pub use error::{Result, StoreError};
pub use ports::MovieStore;
