//! Queue provider and download client traits implemented by backend adapters.

use std::sync::Arc;

use async_trait::async_trait;
use culler_config::{
    ArrInstance, DownloadClientConfig, DownloadClientKind, DownloadProtocol, InstanceType,
};
use culler_events::DeleteReason;

use crate::error::{BackendError, BackendResult};
use crate::model::{
    DownloadSnapshot, QueuePage, QueueRecord, SearchItem, SeedingDownload, record_is_valid,
};

/// Media manager exposing a paginated download queue.
#[async_trait]
pub trait QueueProvider: Send + Sync {
    /// Provider flavour served by this adapter.
    fn instance_type(&self) -> InstanceType;

    /// Fetch one page of the queue (pages are one-based).
    async fn get_queue_items(
        &self,
        instance: &ArrInstance,
        page: u32,
        page_size: u32,
    ) -> BackendResult<QueuePage>;

    /// Whether a record carries the identifiers needed to act on it.
    fn is_record_valid(&self, record: &QueueRecord) -> bool {
        record_is_valid(self.instance_type(), record)
    }

    /// Remove a record from the queue, optionally deleting it from the client.
    async fn delete_queue_item(
        &self,
        instance: &ArrInstance,
        record: &QueueRecord,
        remove_from_client: bool,
        reason: DeleteReason,
    ) -> BackendResult<()>;

    /// Trigger replacement searches.
    async fn search_items(&self, instance: &ArrInstance, items: &[SearchItem])
    -> BackendResult<()>;
}

/// Download client adapter.
#[async_trait]
pub trait DownloadService: Send + Sync {
    /// Operator-facing client name.
    fn name(&self) -> &str;

    /// Client implementation.
    fn kind(&self) -> DownloadClientKind;

    /// Whether the client transfers downloads of `protocol`.
    fn supports(&self, protocol: DownloadProtocol) -> bool {
        self.kind().protocol() == protocol
    }

    /// Authenticate against the client.
    async fn login(&self) -> BackendResult<()>;

    /// Look up a download by hash.
    async fn get_download(&self, hash: &str) -> BackendResult<Option<DownloadSnapshot>>;

    /// Exclude files from a download; default implementation reports lack of support.
    async fn skip_files(&self, hash: &str, indexes: &[usize]) -> BackendResult<()> {
        let _ = (hash, indexes);
        Err(BackendError::Unsupported {
            operation: "download.skip_files",
        })
    }

    /// Completed downloads that are still seeding.
    async fn get_seeding_downloads(&self) -> BackendResult<Vec<SeedingDownload>>;

    /// Create a category if it does not exist; default implementation reports lack of support.
    async fn create_category(&self, name: &str) -> BackendResult<()> {
        let _ = name;
        Err(BackendError::Unsupported {
            operation: "download.create_category",
        })
    }

    /// Move a download into a category; default implementation reports lack of support.
    async fn change_category(&self, hash: &str, category: &str) -> BackendResult<()> {
        let _ = (hash, category);
        Err(BackendError::Unsupported {
            operation: "download.change_category",
        })
    }

    /// Tag a download; default implementation reports lack of support.
    async fn add_tag(&self, hash: &str, tag: &str) -> BackendResult<()> {
        let _ = (hash, tag);
        Err(BackendError::Unsupported {
            operation: "download.add_tag",
        })
    }

    /// Remove a download, optionally deleting its data.
    async fn delete_download(&self, hash: &str, delete_data: bool) -> BackendResult<()>;
}

/// Resolves configured instances and clients to adapters.
pub trait BackendRegistry: Send + Sync {
    /// Adapter for a queue provider type.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotRegistered`] when no adapter exists.
    fn queue_provider(&self, instance_type: InstanceType) -> BackendResult<Arc<dyn QueueProvider>>;

    /// Adapter for a configured download client.
    ///
    /// # Errors
    ///
    /// Returns an error when no adapter exists for the client kind.
    fn download_service(
        &self,
        config: &DownloadClientConfig,
    ) -> BackendResult<Arc<dyn DownloadService>>;
}
