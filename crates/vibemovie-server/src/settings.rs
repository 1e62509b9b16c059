//! Environment-sourced configuration
//!
//! Every setting has a default suitable for the local Cosmos DB emulator, so
//! the server starts without any environment at all.

use config::{Config, ConfigError, Environment, Map};
use reqwest::Url;
use serde::Deserialize;

/// Well-known master key of the Cosmos DB emulator
pub const EMULATOR_KEY: &str =
    "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==";

pub const EMULATOR_ENDPOINT: &str = "https://localhost:8081/";

/// Connection and naming settings for the document store (`COSMOS_*`)
#[derive(Debug, Clone, Deserialize)]
pub struct CosmosSettings {
    pub endpoint: String,
    pub key: String,
    pub db_name: String,
    pub movies_container: String,
    pub ratings_container: String,
    pub comments_container: String,
    pub verify_tls: bool,
}

impl CosmosSettings {
    pub fn is_local_endpoint(&self) -> bool {
        Url::parse(&self.endpoint)
            .ok()
            .and_then(|url| url.host_str().map(|h| h == "localhost" || h == "127.0.0.1"))
            .unwrap_or(false)
    }

    /// The emulator serves a self-signed certificate; verification is only
    /// skipped for local endpoints and can be forced back on.
    pub fn accept_invalid_certs(&self) -> bool {
        self.is_local_endpoint() && !self.verify_tls
    }
}

impl Default for CosmosSettings {
    fn default() -> Self {
        Self {
            endpoint: EMULATOR_ENDPOINT.to_string(),
            key: EMULATOR_KEY.to_string(),
            db_name: "vibemovie-db".to_string(),
            movies_container: "movies".to_string(),
            ratings_container: "ratings".to_string(),
            comments_container: "comments".to_string(),
            verify_tls: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSettings {
    host: String,
    port: u16,
    use_inmemory: bool,
    static_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub use_inmemory: bool,
    pub static_dir: Option<String>,
    pub cosmos: CosmosSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load settings from `source`, or from the process environment when
    /// `source` is `None`. Keys use the environment variable spelling.
    pub fn load(source: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let defaults = CosmosSettings::default();
        let cosmos = Config::builder()
            .set_default("endpoint", defaults.endpoint)?
            .set_default("key", defaults.key)?
            .set_default("db_name", defaults.db_name)?
            .set_default("movies_container", defaults.movies_container)?
            .set_default("ratings_container", defaults.ratings_container)?
            .set_default("comments_container", defaults.comments_container)?
            .set_default("verify_tls", defaults.verify_tls)?
            .add_source(
                Environment::with_prefix("COSMOS")
                    .try_parsing(true)
                    .source(source.clone()),
            )
            .build()?
            .try_deserialize::<CosmosSettings>()?;

        let server = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("use_inmemory", false)?
            .add_source(Environment::default().try_parsing(true).source(source))
            .build()?
            .try_deserialize::<ServerSettings>()?;

        Ok(Self {
            host: server.host,
            port: server.port,
            use_inmemory: server.use_inmemory,
            static_dir: server.static_dir,
            cosmos,
        })
    }

    /// In-memory settings, used by tests and demos
    pub fn in_memory() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            use_inmemory: true,
            static_dir: None,
            cosmos: CosmosSettings::default(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
