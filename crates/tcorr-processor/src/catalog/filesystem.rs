//! Asset catalog backed by JSON files on disk.
//!
//! Layout: `<root>/<collection>/<asset id>.json`, one [`TcorrAsset`] per
//! file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{AssetCatalog, AssetFilter, CollectionKind};
use crate::error::{Result, TcorrError};
use crate::types::TcorrAsset;

/// Catalog reading and writing JSON asset files under a root directory.
#[derive(Debug, Clone)]
pub struct FilesystemCatalog {
    root: PathBuf,
}

impl FilesystemCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_dir(&self, collection: CollectionKind) -> PathBuf {
        self.root.join(collection.as_str())
    }

    fn asset_path(&self, collection: CollectionKind, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(TcorrError::Catalog(format!("invalid asset id: {:?}", id)));
        }
        Ok(self.collection_dir(collection).join(format!("{}.json", id)))
    }

    async fn read_asset(path: &Path) -> Result<TcorrAsset> {
        let bytes = tokio::fs::read(path).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| TcorrError::InvalidAsset(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl AssetCatalog for FilesystemCatalog {
    async fn query(&self, collection: CollectionKind, filter: &AssetFilter) -> Result<Vec<TcorrAsset>> {
        let dir = self.collection_dir(collection);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut assets = Vec::new();
        for path in &paths {
            let asset = Self::read_asset(path).await?;
            if filter.matches(&asset.properties) {
                assets.push(asset);
            }
        }
        debug!(
            collection = %collection,
            scanned = paths.len(),
            matched = assets.len(),
            "Queried filesystem catalog"
        );
        Ok(assets)
    }

    async fn put(&self, collection: CollectionKind, asset: TcorrAsset) -> Result<()> {
        let path = self.asset_path(collection, &asset.id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(&asset)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(collection = %collection, id = %asset.id, "Wrote asset");
        Ok(())
    }

    async fn exists(&self, collection: CollectionKind, id: &str) -> Result<bool> {
        let path = self.asset_path(collection, id)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}
