//! Storage implementations for different backends

pub mod in_memory;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;

pub use in_memory::InMemoryDocumentStore;
#[cfg(feature = "mongodb_backend")]
pub use self::mongodb::MongoDocumentStore;

use crate::config::StorageConfig;
use crate::core::store::DocumentStore;
use anyhow::Result;
use std::sync::Arc;

/// Open the store described by `config`
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    match config {
        StorageConfig::Memory => Ok(Arc::new(InMemoryDocumentStore::new())),
        #[cfg(feature = "mongodb_backend")]
        StorageConfig::Mongodb { uri, database } => {
            Ok(Arc::new(MongoDocumentStore::connect(uri, database).await?))
        }
        #[cfg(not(feature = "mongodb_backend"))]
        StorageConfig::Mongodb { .. } => Err(anyhow::anyhow!(
            "mongodb storage requires the 'mongodb_backend' feature"
        )),
    }
}
