//! In-memory asset catalog.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{AssetCatalog, AssetFilter, CollectionKind};
use crate::error::Result;
use crate::types::TcorrAsset;

type Collections = HashMap<CollectionKind, BTreeMap<String, TcorrAsset>>;

/// Catalog held in memory, for tests and library callers that already have
/// their assets loaded.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from `(collection, asset)` pairs.
    pub fn with_assets(assets: impl IntoIterator<Item = (CollectionKind, TcorrAsset)>) -> Self {
        let mut collections = Collections::new();
        for (kind, asset) in assets {
            collections
                .entry(kind)
                .or_default()
                .insert(asset.id.clone(), asset);
        }
        Self {
            collections: Arc::new(RwLock::new(collections)),
        }
    }

    /// Number of assets in a collection.
    pub async fn len(&self, collection: CollectionKind) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl AssetCatalog for MemoryCatalog {
    async fn query(&self, collection: CollectionKind, filter: &AssetFilter) -> Result<Vec<TcorrAsset>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|assets| {
                assets
                    .values()
                    .filter(|asset| filter.matches(&asset.properties))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put(&self, collection: CollectionKind, asset: TcorrAsset) -> Result<()> {
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .insert(asset.id.clone(), asset);
        Ok(())
    }

    async fn exists(&self, collection: CollectionKind, id: &str) -> Result<bool> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .is_some_and(|assets| assets.contains_key(id)))
    }
}
