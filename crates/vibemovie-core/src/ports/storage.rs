//! Storage trait for movies, ratings and comments

use crate::Result;
use async_trait::async_trait;
use vibemovie_types::{average_stars, Comment, Movie, Rating};

/// Movie store.
///
/// Implemented by every backend with identical semantics. Lookups that find
/// nothing return `None` or an empty `Vec`; the only error is
/// [`StoreError::Unavailable`](crate::StoreError::Unavailable). Returned
/// records are owned copies of the stored data.
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// All movies. Order is backend-defined.
    async fn list_movies(&self) -> Result<Vec<Movie>>;

    /// Store a movie under a freshly generated id. Titles need not be unique.
    async fn create_movie(&self, title: &str) -> Result<Movie>;

    async fn get_movie(&self, id: &str) -> Result<Option<Movie>>;

    /// Append a rating. `movie_id` is not checked against existing movies.
    async fn add_rating(&self, movie_id: &str, stars: u8) -> Result<Rating>;

    async fn list_ratings(&self, movie_id: &str) -> Result<Vec<Rating>>;

    /// Mean stars for a movie rounded to two decimals, `None` when unrated.
    async fn average_rating(&self, movie_id: &str) -> Result<Option<f64>> {
        let ratings = self.list_ratings(movie_id).await?;
        Ok(average_stars(&ratings))
    }

    async fn add_comment(&self, movie_id: &str, text: &str) -> Result<Comment>;

    async fn list_comments(&self, movie_id: &str) -> Result<Vec<Comment>>;
}
