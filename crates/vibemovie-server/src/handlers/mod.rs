//! HTTP handlers

pub mod health;
pub mod movies;

pub use health::health;
