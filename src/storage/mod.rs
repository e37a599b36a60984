//! Key-value storage backends for the memory service
//!
//! The memory service needs a small subset of Redis semantics: string
//! get / set-with-expiry, set-add, set-members, expire and delete.
//! `KeyValueStore` abstracts over the backends so the service logic can be
//! exercised without a running Redis.

mod memory_backend;
#[cfg(feature = "redis")]
mod redis_backend;

pub use memory_backend::InMemoryStore;
#[cfg(feature = "redis")]
pub use redis_backend::RedisStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, ServiceError};

/// Storage backend trait for the memory service
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a string value; `None` if missing or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a string value with a time-to-live
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Add a member to a set, creating the set if needed
    async fn sadd(&self, key: &str, member: &str) -> Result<()>;

    /// All members of a set; empty if the set is missing or expired
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    /// Reset the time-to-live of an existing key
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Delete a key of any type
    async fn delete(&self, key: &str) -> Result<()>;

    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// Open a store by backend name ("redis" or "memory")
pub fn open_store(backend: &str, url: &str) -> Result<Arc<dyn KeyValueStore>> {
    match backend {
        #[cfg(feature = "redis")]
        "redis" => Ok(Arc::new(RedisStore::open(url)?)),
        #[cfg(not(feature = "redis"))]
        "redis" => {
            let _ = url;
            Err(ServiceError::InvalidInput(
                "Redis storage requires the 'redis' feature to be enabled".to_string(),
            ))
        }
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        other => Err(ServiceError::InvalidInput(format!(
            "Unknown storage backend: '{}'. Use 'redis' or 'memory'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_store_memory() {
        let store = open_store("memory", "").unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn test_open_store_unknown() {
        assert!(matches!(
            open_store("sqlite", ""),
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
