//! Storage layer
//!
//! Uses Cosmos DB (or its local emulator) for persistence.
//! Uses an in-memory store instead when `USE_INMEMORY` is set.

pub mod cosmos;
pub mod memory;

pub use cosmos::CosmosStore;
pub use memory::MemoryStore;

use crate::settings::Settings;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use vibemovie_core::{MovieStore, Result};

/// Selects the backend from settings and caches it once constructed.
///
/// A failed construction leaves the selector uninitialized, so the next
/// `get` retries from scratch. Once ready, the same store is returned for
/// the lifetime of the selector.
pub struct StoreSelector {
    settings: Settings,
    store: OnceCell<Arc<dyn MovieStore>>,
}

impl StoreSelector {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            store: OnceCell::new(),
        }
    }

    /// Selector that is already ready with the given store
    pub fn ready(store: Arc<dyn MovieStore>) -> Self {
        Self {
            settings: Settings::in_memory(),
            store: OnceCell::new_with(Some(store)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.store.initialized()
    }

    pub async fn get(&self) -> Result<Arc<dyn MovieStore>> {
        self.store
            .get_or_try_init(|| self.build())
            .await
            .cloned()
    }

    async fn build(&self) -> Result<Arc<dyn MovieStore>> {
        if self.settings.use_inmemory {
            info!("Using in-memory store");
            return Ok(Arc::new(MemoryStore::new()));
        }

        match CosmosStore::connect(&self.settings.cosmos).await {
            Ok(store) => Ok(Arc::new(store)),
            Err(e) => {
                warn!("Cosmos DB store unavailable: {}", e);
                Err(e)
            }
        }
    }
}
