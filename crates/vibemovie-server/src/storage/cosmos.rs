//! Cosmos DB document store (SQL REST API)
//!
//! Talks to Azure Cosmos DB or the local emulator with master-key auth.
//! Construction provisions the database and the three containers, so a store
//! that exists is ready to serve requests.

use crate::settings::CosmosSettings;
use crate::utils::percent_encode;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, info, warn};
use vibemovie_core::{Comment, Movie, MovieStore, Rating, Result, StoreError};

const API_VERSION: &str = "2018-12-31";

#[derive(Debug, Clone, Copy)]
enum ResourceType {
    Databases,
    Containers,
    Documents,
}

impl ResourceType {
    fn as_str(self) -> &'static str {
        match self {
            ResourceType::Databases => "dbs",
            ResourceType::Containers => "colls",
            ResourceType::Documents => "docs",
        }
    }
}

/// Build the `authorization` header value for a master-key signed request.
///
/// `date` must be the exact value sent in `x-ms-date`.
pub(crate) fn master_key_auth(
    key: &[u8],
    method: &Method,
    resource_type: &str,
    resource_link: &str,
    date: &str,
) -> Result<String> {
    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        method.as_str().to_lowercase(),
        resource_type.to_lowercase(),
        resource_link,
        date.to_lowercase()
    );

    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| StoreError::unavailable(format!("invalid master key: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    Ok(percent_encode(&format!("type=master&ver=1.0&sig={}", signature)))
}

fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn partition_key_header(value: &str) -> Result<String> {
    serde_json::to_string(&[value]).map_err(StoreError::unavailable)
}

#[derive(Serialize)]
struct QuerySpec<'a> {
    query: &'a str,
    parameters: Vec<QueryParameter<'a>>,
}

#[derive(Serialize)]
struct QueryParameter<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct DocumentPage<T> {
    #[serde(rename = "Documents")]
    documents: Vec<T>,
}

/// Longest response body carried in an error. Errors end up in the flash
/// cookie, which browsers drop past ~4 KB.
const MAX_ERROR_BODY: usize = 512;

async fn unexpected_status(what: &str, response: Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let shown = truncate_at_char(&body, MAX_ERROR_BODY);
    if shown.len() < body.len() {
        warn!("{} failed with status {}: {}", what, status, body);
        return StoreError::unavailable(format!(
            "{} failed with status {}: {}...",
            what, status, shown
        ));
    }
    StoreError::unavailable(format!("{} failed with status {}: {}", what, status, body))
}

fn truncate_at_char(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub struct CosmosStore {
    http: reqwest::Client,
    endpoint: String,
    key: Vec<u8>,
    database: String,
    movies: String,
    ratings: String,
    comments: String,
}

impl CosmosStore {
    /// Connect and make sure the database and containers exist.
    pub async fn connect(settings: &CosmosSettings) -> Result<Self> {
        info!("Connecting to Cosmos DB at: {}", settings.endpoint);

        let key = BASE64
            .decode(settings.key.trim())
            .map_err(|e| StoreError::unavailable(format!("invalid master key: {}", e)))?;

        if settings.accept_invalid_certs() {
            warn!("TLS certificate verification disabled for local endpoint");
        }

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(settings.accept_invalid_certs())
            .build()
            .map_err(|e| {
                StoreError::unavailable(format!("failed to create HTTP client: {}", e))
            })?;

        let store = Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            key,
            database: settings.db_name.clone(),
            movies: settings.movies_container.clone(),
            ratings: settings.ratings_container.clone(),
            comments: settings.comments_container.clone(),
        };

        store.provision().await?;
        info!("Cosmos DB database '{}' ready", store.database);

        Ok(store)
    }

    async fn provision(&self) -> Result<()> {
        self.create_if_missing(
            ResourceType::Databases,
            "",
            "dbs",
            json!({ "id": self.database }),
            &format!("database '{}'", self.database),
        )
        .await?;

        let db_link = format!("dbs/{}", self.database);
        let containers = [
            (&self.movies, "/id"),
            (&self.ratings, "/movieId"),
            (&self.comments, "/movieId"),
        ];
        for (name, partition_path) in containers {
            self.create_if_missing(
                ResourceType::Containers,
                &db_link,
                &format!("{}/colls", db_link),
                json!({
                    "id": name,
                    "partitionKey": { "paths": [partition_path], "kind": "Hash" }
                }),
                &format!("container '{}'", name),
            )
            .await?;
        }

        Ok(())
    }

    fn container_link(&self, container: &str) -> String {
        format!("dbs/{}/colls/{}", self.database, container)
    }

    fn request(
        &self,
        method: Method,
        resource_type: ResourceType,
        resource_link: &str,
        path: &str,
    ) -> Result<RequestBuilder> {
        let date = http_date();
        let auth = master_key_auth(
            &self.key,
            &method,
            resource_type.as_str(),
            resource_link,
            &date,
        )?;

        Ok(self
            .http
            .request(method, format!("{}/{}", self.endpoint, path))
            .header("authorization", auth)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION))
    }

    async fn send(request: RequestBuilder, what: &str) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| StoreError::unavailable(format!("{}: {}", what, e)))
    }

    async fn create_if_missing(
        &self,
        resource_type: ResourceType,
        resource_link: &str,
        path: &str,
        body: serde_json::Value,
        what: &str,
    ) -> Result<()> {
        let request = self
            .request(Method::POST, resource_type, resource_link, path)?
            .json(&body);
        let response = Self::send(request, &format!("create {}", what)).await?;

        match response.status() {
            StatusCode::CREATED => info!("Created {}", what),
            StatusCode::OK | StatusCode::CONFLICT => debug!("{} already exists", what),
            _ => return Err(unexpected_status(&format!("create {}", what), response).await),
        }

        Ok(())
    }

    async fn create_document<T: Serialize>(
        &self,
        container: &str,
        partition_key: &str,
        document: &T,
    ) -> Result<()> {
        let link = self.container_link(container);
        let request = self
            .request(
                Method::POST,
                ResourceType::Documents,
                &link,
                &format!("{}/docs", link),
            )?
            .header(
                "x-ms-documentdb-partitionkey",
                partition_key_header(partition_key)?,
            )
            .json(document);

        let what = format!("create document in '{}'", container);
        let response = Self::send(request, &what).await?;
        match response.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(()),
            _ => Err(unexpected_status(&what, response).await),
        }
    }

    /// Point read. Only a 404 is treated as absence; every other failure is
    /// reported as unavailable.
    async fn read_document<T: DeserializeOwned>(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<T>> {
        let container_link = self.container_link(container);
        let link = format!("{}/docs/{}", container_link, id);
        let path = format!("{}/docs/{}", container_link, percent_encode(id));
        let request = self
            .request(Method::GET, ResourceType::Documents, &link, &path)?
            .header(
                "x-ms-documentdb-partitionkey",
                partition_key_header(partition_key)?,
            );

        let what = format!("read document '{}' from '{}'", id, container);
        let response = Self::send(request, &what).await?;
        match response.status() {
            StatusCode::OK => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|e| StoreError::unavailable(format!("{}: invalid body: {}", what, e))),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(unexpected_status(&what, response).await),
        }
    }

    /// Cross-partition SQL query, following continuation tokens to the end.
    async fn query<T: DeserializeOwned>(
        &self,
        container: &str,
        query: &str,
        parameters: Vec<QueryParameter<'_>>,
    ) -> Result<Vec<T>> {
        let link = self.container_link(container);
        let body = serde_json::to_vec(&QuerySpec { query, parameters })
            .map_err(StoreError::unavailable)?;
        let what = format!("query '{}'", container);

        let mut items = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let mut request = self
                .request(
                    Method::POST,
                    ResourceType::Documents,
                    &link,
                    &format!("{}/docs", link),
                )?
                .header("content-type", "application/query+json")
                .header("x-ms-documentdb-isquery", "True")
                .header("x-ms-documentdb-query-enablecrosspartition", "True")
                .body(body.clone());
            if let Some(token) = &continuation {
                request = request.header("x-ms-continuation", token.as_str());
            }

            let response = Self::send(request, &what).await?;
            if response.status() != StatusCode::OK {
                return Err(unexpected_status(&what, response).await);
            }

            continuation = response
                .headers()
                .get("x-ms-continuation")
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            let page = response
                .json::<DocumentPage<T>>()
                .await
                .map_err(|e| StoreError::unavailable(format!("{}: invalid body: {}", what, e)))?;
            items.extend(page.documents);

            if continuation.is_none() {
                break;
            }
        }

        debug!("Query on '{}' returned {} documents", container, items.len());
        Ok(items)
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl MovieStore for CosmosStore {
    async fn list_movies(&self) -> Result<Vec<Movie>> {
        self.query(&self.movies, "SELECT c.id, c.title FROM c", vec![])
            .await
    }

    async fn create_movie(&self, title: &str) -> Result<Movie> {
        let movie = Movie::new(new_id(), title);
        self.create_document(&self.movies, &movie.id, &movie).await?;
        debug!("Created movie document {}", movie.id);
        Ok(movie)
    }

    async fn get_movie(&self, id: &str) -> Result<Option<Movie>> {
        self.read_document(&self.movies, id, id).await
    }

    async fn add_rating(&self, movie_id: &str, stars: u8) -> Result<Rating> {
        let rating = Rating::new(new_id(), movie_id, stars);
        self.create_document(&self.ratings, movie_id, &rating).await?;
        Ok(rating)
    }

    async fn list_ratings(&self, movie_id: &str) -> Result<Vec<Rating>> {
        self.query(
            &self.ratings,
            "SELECT c.id, c.movieId, c.stars FROM c WHERE c.movieId = @movieId",
            vec![QueryParameter {
                name: "@movieId",
                value: movie_id,
            }],
        )
        .await
    }

    async fn add_comment(&self, movie_id: &str, text: &str) -> Result<Comment> {
        let comment = Comment::new(new_id(), movie_id, text);
        self.create_document(&self.comments, movie_id, &comment)
            .await?;
        Ok(comment)
    }

    async fn list_comments(&self, movie_id: &str) -> Result<Vec<Comment>> {
        self.query(
            &self.comments,
            "SELECT c.id, c.movieId, c.text FROM c WHERE c.movieId = @movieId",
            vec![QueryParameter {
                name: "@movieId",
                value: movie_id,
            }],
        )
        .await
    }
}
