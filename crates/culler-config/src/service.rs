//! Configuration sources and the snapshot service consumed by policy runs.
//!
//! # Design
//! - `ConfigSource` hides where documents live (file, memory, future stores).
//! - `ConfigService` serializes snapshot reads and replacements behind one
//!   async mutex so concurrent policy runs never observe a half-applied change.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::error::{ConfigError, ConfigResult};
use crate::loader::{ConfigFormat, load_from_path, render_document};
use crate::model::ConfigSnapshot;
use crate::validate::validate_snapshot;

/// Backend that produces configuration snapshots.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Load the current configuration.
    async fn load(&self) -> ConfigResult<ConfigSnapshot>;

    /// Persist a replacement configuration.
    async fn store(&self, _snapshot: &ConfigSnapshot) -> ConfigResult<()> {
        Err(ConfigError::Unsupported {
            operation: "config.store",
        })
    }
}

/// Configuration document on disk (JSON or YAML by extension).
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    /// Create a source reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self) -> ConfigResult<ConfigSnapshot> {
        load_from_path(&self.path).await
    }

    async fn store(&self, snapshot: &ConfigSnapshot) -> ConfigResult<()> {
        let rendered = render_document(snapshot, ConfigFormat::from_path(&self.path))?;
        tokio::fs::write(&self.path, rendered)
            .await
            .map_err(|source| ConfigError::Io {
                operation: "config.write",
                path: self.path.clone(),
                source,
            })
    }
}

/// In-memory configuration, mostly useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    snapshot: RwLock<ConfigSnapshot>,
}

impl MemoryConfigSource {
    /// Create a source holding `snapshot`.
    #[must_use]
    pub const fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }
}

#[async_trait]
impl ConfigSource for MemoryConfigSource {
    async fn load(&self) -> ConfigResult<ConfigSnapshot> {
        Ok(self
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn store(&self, snapshot: &ConfigSnapshot) -> ConfigResult<()> {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        Ok(())
    }
}

/// Serialized access to validated configuration snapshots.
#[derive(Clone)]
pub struct ConfigService {
    source: Arc<dyn ConfigSource>,
    gate: Arc<Mutex<()>>,
    current: Arc<RwLock<Option<Arc<ConfigSnapshot>>>>,
}

impl ConfigService {
    /// Wrap a configuration source.
    #[must_use]
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self {
            source,
            gate: Arc::new(Mutex::new(())),
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Convenience constructor over an in-memory snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: ConfigSnapshot) -> Self {
        Self::new(Arc::new(MemoryConfigSource::new(snapshot)))
    }

    /// Load and validate the current configuration.
    ///
    /// The revision increments whenever the loaded content differs from the
    /// previously returned snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the document is invalid.
    #[instrument(name = "config.snapshot", skip(self))]
    pub async fn snapshot(&self) -> ConfigResult<Arc<ConfigSnapshot>> {
        let _guard = self.gate.lock().await;
        let mut loaded = self.source.load().await?;
        validate_snapshot(&loaded)?;
        Ok(self.publish(&mut loaded))
    }

    /// Validate, persist, and publish a replacement configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the source rejects the write.
    #[instrument(name = "config.replace", skip(self, snapshot))]
    pub async fn replace(&self, mut snapshot: ConfigSnapshot) -> ConfigResult<Arc<ConfigSnapshot>> {
        let _guard = self.gate.lock().await;
        validate_snapshot(&snapshot)?;
        self.source.store(&snapshot).await?;
        let published = self.publish(&mut snapshot);
        info!(revision = published.revision, "configuration replaced");
        Ok(published)
    }

    /// Most recently published snapshot, if any.
    #[must_use]
    pub fn last(&self) -> Option<Arc<ConfigSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, snapshot: &mut ConfigSnapshot) -> Arc<ConfigSnapshot> {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(previous) => {
                snapshot.revision = previous.revision;
                if **previous == *snapshot {
                    return Arc::clone(previous);
                }
                snapshot.revision = previous.revision + 1;
            }
            None => snapshot.revision = 1,
        }
        let published = Arc::new(snapshot.clone());
        *current = Some(Arc::clone(&published));
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revision_increments_only_on_change() -> ConfigResult<()> {
        let service = ConfigService::from_snapshot(ConfigSnapshot::default());
        let first = service.snapshot().await?;
        assert_eq!(first.revision, 1);
        let again = service.snapshot().await?;
        assert_eq!(again.revision, 1);

        let mut changed = (*again).clone();
        changed.general.dry_run = true;
        let replaced = service.replace(changed).await?;
        assert_eq!(replaced.revision, 2);
        assert!(service.snapshot().await?.general.dry_run);
        assert_eq!(service.last().map(|s| s.revision), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn replace_rejects_invalid_snapshot() -> ConfigResult<()> {
        let service = ConfigService::from_snapshot(ConfigSnapshot::default());
        let mut invalid = ConfigSnapshot::default();
        invalid.general.http_timeout_secs = 0;
        assert!(service.replace(invalid).await.is_err());
        assert_eq!(service.snapshot().await?.general.http_timeout_secs, 100);
        Ok(())
    }
}
