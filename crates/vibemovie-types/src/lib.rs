//! VibeMovie Types - Pure record definitions
//!
//! This crate contains only plain data types shared by the storage layer
//! and the web layer. It has no async runtime dependencies.

pub mod movie;
pub mod review;

pub use movie::*;
pub use review::*;
