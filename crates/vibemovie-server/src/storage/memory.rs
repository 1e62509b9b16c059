//! In-memory store for demos and offline mode (`USE_INMEMORY=1`)

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use vibemovie_core::{Comment, Movie, MovieStore, Rating, Result};

/// Process-local stand-in for the document store.
///
/// Movies keep insertion order. Ratings and comments are bucketed by movie
/// id, mirroring the partition layout of the persistent store. Nothing here
/// coordinates concurrent writers beyond keeping each call memory-safe.
pub struct MemoryStore {
    movies: RwLock<Vec<Movie>>,
    ratings: DashMap<String, Vec<Rating>>,
    comments: DashMap<String, Vec<Comment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            movies: RwLock::new(Vec::new()),
            ratings: DashMap::new(),
            comments: DashMap::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn list_movies(&self) -> Result<Vec<Movie>> {
        Ok(self.movies.read().await.clone())
    }

    async fn create_movie(&self, title: &str) -> Result<Movie> {
        let movie = Movie::new(new_id(), title);
        self.movies.write().await.push(movie.clone());
        Ok(movie)
    }

    async fn get_movie(&self, id: &str) -> Result<Option<Movie>> {
        Ok(self
            .movies
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn add_rating(&self, movie_id: &str, stars: u8) -> Result<Rating> {
        let rating = Rating::new(new_id(), movie_id, stars);
        self.ratings
            .entry(movie_id.to_string())
            .or_default()
            .push(rating.clone());
        Ok(rating)
    }

    async fn list_ratings(&self, movie_id: &str) -> Result<Vec<Rating>> {
        Ok(self
            .ratings
            .get(movie_id)
            .map(|bucket| bucket.value().clone())
            .unwrap_or_default())
    }

    async fn add_comment(&self, movie_id: &str, text: &str) -> Result<Comment> {
        let comment = Comment::new(new_id(), movie_id, text);
        self.comments
            .entry(movie_id.to_string())
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, movie_id: &str) -> Result<Vec<Comment>> {
        Ok(self
            .comments
            .get(movie_id)
            .map(|bucket| bucket.value().clone())
            .unwrap_or_default())
    }
}
