//! Rating and comment types

use serde::{Deserialize, Serialize};

/// Star rating attached to a movie. Stars are expected in `0..=5`; the range
/// is checked by the web layer, not by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: String,
    pub movie_id: String,
    pub stars: u8,
}

/// Free-text comment attached to a movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub movie_id: String,
    pub text: String,
}

impl Rating {
    pub fn new(id: impl Into<String>, movie_id: impl Into<String>, stars: u8) -> Self {
        Self {
            id: id.into(),
            movie_id: movie_id.into(),
            stars,
        }
    }
}

impl Comment {
    pub fn new(id: impl Into<String>, movie_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            movie_id: movie_id.into(),
            text: text.into(),
        }
    }
}

/// Arithmetic mean of the stars, rounded to two decimals with ties to even
/// (`0.625` becomes `0.62`).
///
/// Returns `None` for an empty slice rather than zero.
pub fn average_stars(ratings: &[Rating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: u64 = ratings.iter().map(|r| u64::from(r.stars)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    Some((mean * 100.0).round_ties_even() / 100.0)
}

/// Render an average for display. Whole numbers keep one decimal (`5.0`).
pub fn format_average(avg: f64) -> String {
    if avg.fract() == 0.0 {
        format!("{:.1}", avg)
    } else {
        avg.to_string()
    }
}
