//! Flash message extractor
//!
//! Messages survive one redirect in a `flash` cookie and are cleared when a
//! page is rendered.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

const COOKIE_NAME: &str = "flash";
const CLEAR_COOKIE: &str = "flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

/// Pending flash messages for the current request
#[derive(Debug, Default)]
pub struct Flashes(Vec<Flash>);

impl Flashes {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let messages = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().strip_prefix("flash="))
            .filter(|encoded| !encoded.is_empty())
            .find_map(decode)
            .unwrap_or_default();
        Self(messages)
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        self.0.push(Flash {
            level,
            message: message.into(),
        });
    }

    pub fn messages(&self) -> &[Flash] {
        &self.0
    }

    /// Redirect, carrying every pending message to the next page
    pub fn redirect(self, to: &str) -> Response {
        let redirect = Redirect::to(to);
        if self.0.is_empty() {
            return redirect.into_response();
        }
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            COOKIE_NAME,
            encode(&self.0)
        );
        ([(header::SET_COOKIE, cookie)], redirect).into_response()
    }

    /// Respond with a rendered page; the messages are consumed
    pub fn page(self, html: String) -> Response {
        ([(header::SET_COOKIE, CLEAR_COOKIE)], Html(html)).into_response()
    }
}

fn encode(messages: &[Flash]) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(messages).unwrap_or_default())
}

fn decode(encoded: &str) -> Option<Vec<Flash>> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[async_trait]
impl<S> FromRequestParts<S> for Flashes
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn set_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_redirect_carries_messages() {
        let mut flashes = Flashes::default();
        flashes.push(Level::Success, "Added 'Inception'");
        flashes.push(Level::Error, "Comment cannot be empty");

        let response = flashes.redirect("/movies/1");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/movies/1");

        let cookie = set_cookie(&response);
        let pair = cookie.split(';').next().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}", pair)).unwrap(),
        );
        let restored = Flashes::from_headers(&headers);
        assert_eq!(
            restored.messages(),
            &[
                Flash {
                    level: Level::Success,
                    message: "Added 'Inception'".to_string(),
                },
                Flash {
                    level: Level::Error,
                    message: "Comment cannot be empty".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_redirect_without_messages_sets_no_cookie() {
        let response = Flashes::default().redirect("/");
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[test]
    fn test_page_clears_cookie() {
        let response = Flashes::default().page("<p>ok</p>".to_string());
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).contains("Max-Age=0"));
    }

    #[test]
    fn test_garbage_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("flash=%%%not-base64"));
        assert!(Flashes::from_headers(&headers).messages().is_empty());
    }
}
