//! Movie page handlers
//!
//! Thin adapters between HTML forms and the store. Store failures never turn
//! into 5xx responses: reads render with empty data and a warning, writes
//! flash the error and redirect.

use crate::extractors::{Flashes, Level};
use crate::views::{self, movie_href, MovieDetail};
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::Response,
    Form,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use vibemovie_core::{Movie, Result};

#[derive(Debug, Deserialize)]
pub struct MovieForm {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
pub struct RatingForm {
    stars: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    text: String,
}

/// Parse a submitted star count. A missing field counts as zero.
fn parse_stars(raw: Option<&str>) -> Option<u8> {
    let stars: i64 = raw.unwrap_or("0").trim().parse().ok()?;
    if (0..=5).contains(&stars) {
        u8::try_from(stars).ok()
    } else {
        None
    }
}

async fn load_movies(state: &AppState) -> Result<Vec<Movie>> {
    state.stores.get().await?.list_movies().await
}

async fn load_detail(state: &AppState, id: &str) -> Result<Option<MovieDetail>> {
    let store = state.stores.get().await?;
    let Some(movie) = store.get_movie(id).await? else {
        return Ok(None);
    };

    Ok(Some(MovieDetail {
        movie,
        ratings: store.list_ratings(id).await?,
        comments: store.list_comments(id).await?,
        average: store.average_rating(id).await?,
    }))
}

pub async fn index(State(state): State<AppState>, mut flashes: Flashes) -> Response {
    match load_movies(&state).await {
        Ok(movies) => {
            let html = views::index(&movies, flashes.messages(), None);
            flashes.page(html)
        }
        Err(e) => {
            warn!("Rendering movie list without data: {}", e);
            let message = e.to_string();
            flashes.push(Level::Warning, message.clone());
            let html = views::index(&[], flashes.messages(), Some(&message));
            flashes.page(html)
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    mut flashes: Flashes,
    Form(form): Form<MovieForm>,
) -> Response {
    let title = form.title.trim();
    if title.is_empty() {
        flashes.push(Level::Error, "Movie title is required");
        return flashes.redirect("/");
    }

    let result = match state.stores.get().await {
        Ok(store) => store.create_movie(title).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(movie) => {
            info!("Added movie {} ({})", movie.id, movie.title);
            flashes.push(Level::Success, format!("Added '{}'", movie.title));
        }
        Err(e) => {
            error!("Failed to add movie: {}", e);
            flashes.push(Level::Error, e.to_string());
        }
    }
    flashes.redirect("/")
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut flashes: Flashes,
) -> Response {
    match load_detail(&state, &id).await {
        Ok(Some(detail)) => {
            let html = views::movie(Some(&detail), flashes.messages(), None);
            flashes.page(html)
        }
        Ok(None) => {
            flashes.push(Level::Error, "Movie not found");
            flashes.redirect("/")
        }
        Err(e) => {
            warn!("Rendering movie {} without data: {}", id, e);
            let message = e.to_string();
            flashes.push(Level::Warning, message.clone());
            let html = views::movie(None, flashes.messages(), Some(&message));
            flashes.page(html)
        }
    }
}

pub async fn rate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut flashes: Flashes,
    Form(form): Form<RatingForm>,
) -> Response {
    let back = movie_href(&id);
    let Some(stars) = parse_stars(form.stars.as_deref()) else {
        flashes.push(Level::Error, "Rating must be an integer between 0 and 5");
        return flashes.redirect(&back);
    };

    let result = match state.stores.get().await {
        Ok(store) => store.add_rating(&id, stars).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(_) => flashes.push(Level::Success, "Rating added"),
        Err(e) => {
            error!("Failed to add rating to {}: {}", id, e);
            flashes.push(Level::Error, e.to_string());
        }
    }
    flashes.redirect(&back)
}

pub async fn comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut flashes: Flashes,
    Form(form): Form<CommentForm>,
) -> Response {
    let back = movie_href(&id);
    let text = form.text.trim();
    if text.is_empty() {
        flashes.push(Level::Error, "Comment cannot be empty");
        return flashes.redirect(&back);
    }

    let result = match state.stores.get().await {
        Ok(store) => store.add_comment(&id, text).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(_) => flashes.push(Level::Success, "Comment added"),
        Err(e) => {
            error!("Failed to add comment to {}: {}", id, e);
            flashes.push(Level::Error, e.to_string());
        }
    }
    flashes.redirect(&back)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::storage::{MemoryStore, StoreSelector};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;
    use vibemovie_core::MovieStore;

    /// Drives the router like a browser: keeps the flash cookie and follows
    /// redirects.
    struct Browser {
        app: Router,
        cookie: Option<String>,
    }

    struct Page {
        status: StatusCode,
        location: Option<String>,
        body: String,
    }

    impl Browser {
        fn new(state: AppState) -> Self {
            Self {
                app: crate::router(state, None),
                cookie: None,
            }
        }

        async fn send(&mut self, request: Request<Body>) -> Page {
            let response = self.app.clone().oneshot(request).await.unwrap();
            if let Some(set) = response.headers().get(header::SET_COOKIE) {
                let pair = set.to_str().unwrap().split(';').next().unwrap().to_string();
                self.cookie = if pair == "flash=" { None } else { Some(pair) };
            }
            let status = response.status();
            let location = response
                .headers()
                .get(header::LOCATION)
                .map(|v| v.to_str().unwrap().to_string());
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            Page {
                status,
                location,
                body: String::from_utf8(bytes.to_vec()).unwrap(),
            }
        }

        fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(cookie) = &self.cookie {
                builder = builder.header(header::COOKIE, cookie);
            }
            builder
        }

        async fn get(&mut self, uri: &str) -> Page {
            let request = self.request("GET", uri).body(Body::empty()).unwrap();
            self.send(request).await
        }

        /// Submit a form and follow redirects to the rendered page
        async fn submit(&mut self, uri: &str, form: &str) -> Page {
            let request = self
                .request("POST", uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap();
            let mut page = self.send(request).await;
            while page.status == StatusCode::SEE_OTHER {
                let location = page.location.clone().unwrap();
                page = self.get(&location).await;
            }
            page
        }
    }

    fn memory_state() -> (AppState, Arc<dyn MovieStore>) {
        let store: Arc<dyn MovieStore> = Arc::new(MemoryStore::new());
        let state = AppState {
            stores: Arc::new(StoreSelector::ready(store.clone())),
        };
        (state, store)
    }

    fn unreachable_state() -> AppState {
        let mut settings = Settings::in_memory();
        settings.use_inmemory = false;
        settings.cosmos.endpoint = "http://127.0.0.1:1/".to_string();
        AppState {
            stores: Arc::new(StoreSelector::new(settings)),
        }
    }

    #[test]
    fn test_parse_stars() {
        assert_eq!(parse_stars(Some("5")), Some(5));
        assert_eq!(parse_stars(Some(" 3 ")), Some(3));
        assert_eq!(parse_stars(None), Some(0));
        assert_eq!(parse_stars(Some("6")), None);
        assert_eq!(parse_stars(Some("-1")), None);
        assert_eq!(parse_stars(Some("four")), None);
        assert_eq!(parse_stars(Some("")), None);
    }

    #[tokio::test]
    async fn test_index_shows_empty_list() {
        let (state, _) = memory_state();
        let mut browser = Browser::new(state);

        let page = browser.get("/").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("No movies yet"));
    }

    #[tokio::test]
    async fn test_add_movie_rate_and_comment() {
        let (state, store) = memory_state();
        let mut browser = Browser::new(state);

        let page = browser.submit("/movies", "title=Inception").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("Added &#x27;Inception&#x27;"));

        let movie = store.list_movies().await.unwrap().remove(0);
        let href = format!("/movies/{}", movie.id);
        assert!(page.body.contains(&href));

        let page = browser.submit(&format!("{}/rate", href), "stars=5").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("Rating added"));
        assert!(page.body.contains("5 / 5"));
        assert!(page.body.contains("Average rating: 5.0 / 5"));

        let page = browser
            .submit(&format!("{}/comment", href), "text=Great%21")
            .await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("Comment added"));
        assert!(page.body.contains("Great!"));

        // Flash messages are shown once
        let page = browser.get(&href).await;
        assert!(!page.body.contains("Comment added"));
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (state, store) = memory_state();
        let mut browser = Browser::new(state);

        let page = browser.submit("/movies", "title=+++").await;
        assert!(page.body.contains("Movie title is required"));
        assert!(store.list_movies().await.unwrap().is_empty());

        let movie = store.create_movie("Heat").await.unwrap();
        let href = format!("/movies/{}", movie.id);

        let page = browser.submit(&format!("{}/rate", href), "stars=9").await;
        assert!(page.body.contains("Rating must be an integer between 0 and 5"));

        let page = browser.submit(&format!("{}/rate", href), "stars=abc").await;
        assert!(page.body.contains("Rating must be an integer between 0 and 5"));
        assert!(store.list_ratings(&movie.id).await.unwrap().is_empty());

        let page = browser.submit(&format!("{}/comment", href), "text=").await;
        assert!(page.body.contains("Comment cannot be empty"));
        assert!(store.list_comments(&movie.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_movie_redirects_home() {
        let (state, _) = memory_state();
        let mut browser = Browser::new(state);

        let page = browser.get("/movies/nonexistent").await;
        assert_eq!(page.status, StatusCode::SEE_OTHER);
        assert_eq!(page.location.as_deref(), Some("/"));

        let page = browser.get("/").await;
        assert!(page.body.contains("Movie not found"));
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades() {
        let mut browser = Browser::new(unreachable_state());

        let page = browser.get("/").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("No movies yet"));
        assert!(page.body.contains("flash-warning"));
        assert!(page.body.contains("Database unavailable"));

        let page = browser.get("/movies/abc").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("Movie details are unavailable"));

        let page = browser.submit("/movies", "title=Inception").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("flash-error"));
        assert!(!page.body.contains("Added"));

        let page = browser.submit("/movies/abc/rate", "stars=4").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("flash-error"));
        assert!(!page.body.contains("Rating added"));

        let page = browser.submit("/movies/abc/comment", "text=Great%21").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.body.contains("flash-error"));
        assert!(!page.body.contains("Comment added"));
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = memory_state();
        let mut browser = Browser::new(state);

        let page = browser.get("/health").await;
        assert_eq!(page.status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&page.body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["store_ready"], true);
    }
}
