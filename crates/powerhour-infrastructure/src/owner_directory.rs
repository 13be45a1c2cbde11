//! CRM owner id -> display name resolution.

use async_trait::async_trait;
use powerhour_core::config::PowerHourConfig;
use powerhour_core::error::Result;
use powerhour_core::ports::OwnerDirectory;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Owner names taken from the `[owners]` table of the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticOwnerDirectory {
    names: HashMap<String, String>,
}

impl StaticOwnerDirectory {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    pub fn from_config(config: &PowerHourConfig) -> Self {
        Self::new(config.owners.clone())
    }
}

#[async_trait]
impl OwnerDirectory for StaticOwnerDirectory {
    async fn owner_name(&self, owner_id: &str) -> Result<Option<String>> {
        Ok(self.names.get(owner_id).cloned())
    }
}

/// Remembers names resolved by another directory.
///
/// Only hits are cached: an unknown owner is asked again next time, and an
/// upstream failure is passed through untouched.
pub struct CachedOwnerDirectory<D> {
    inner: D,
    cache: RwLock<HashMap<String, String>>,
}

impl<D: OwnerDirectory> CachedOwnerDirectory<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl<D: OwnerDirectory> OwnerDirectory for CachedOwnerDirectory<D> {
    async fn owner_name(&self, owner_id: &str) -> Result<Option<String>> {
        if let Some(name) = self.cache.read().await.get(owner_id) {
            return Ok(Some(name.clone()));
        }

        let resolved = self.inner.owner_name(owner_id).await?;
        if let Some(name) = &resolved {
            tracing::debug!(target: "owners", "[OwnerDirectory] Cached owner {} -> {}", owner_id, name);
            self.cache
                .write()
                .await
                .insert(owner_id.to_string(), name.clone());
        }
        Ok(resolved)
    }
}
