//! Recording fakes for the backend traits.
//!
//! Every fake stores what it was asked to do so tests can assert on the side
//! effects of a policy run without a real media manager or download client.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use culler_config::{ArrInstance, DownloadClientConfig, DownloadClientKind, InstanceType};
use culler_core::{
    BackendError, BackendRegistry, BackendResult, DownloadService, DownloadSnapshot, QueuePage,
    QueueProvider, QueueRecord, SearchItem, SeedingDownload,
};
use culler_events::DeleteReason;

/// Queue deletion observed by [`FakeQueueProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedItem {
    /// Instance name.
    pub instance: String,
    /// Download id of the removed record.
    pub download_id: String,
    /// Client data was requested to be deleted too.
    pub remove_from_client: bool,
    /// Removal reason.
    pub reason: DeleteReason,
}

/// In-memory queue provider.
pub struct FakeQueueProvider {
    instance_type: InstanceType,
    records: RwLock<Vec<QueueRecord>>,
    failing_instances: RwLock<HashSet<String>>,
    page_requests: RwLock<Vec<(String, u32)>>,
    deleted: RwLock<Vec<DeletedItem>>,
    searches: RwLock<Vec<Vec<SearchItem>>>,
}

impl FakeQueueProvider {
    /// Empty queue for `instance_type`.
    #[must_use]
    pub fn new(instance_type: InstanceType) -> Self {
        Self {
            instance_type,
            records: RwLock::new(Vec::new()),
            failing_instances: RwLock::new(HashSet::new()),
            page_requests: RwLock::new(Vec::new()),
            deleted: RwLock::new(Vec::new()),
            searches: RwLock::new(Vec::new()),
        }
    }

    /// Replace the queue served to every instance.
    pub fn set_queue(&self, records: Vec<QueueRecord>) {
        *self.records.write().unwrap_or_else(PoisonError::into_inner) = records;
    }

    /// Make queue reads for the named instance fail.
    pub fn fail_instance(&self, name: &str) {
        self.failing_instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());
    }

    /// `(instance, page)` pairs requested so far.
    #[must_use]
    pub fn page_requests(&self) -> Vec<(String, u32)> {
        self.page_requests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queue deletions performed so far.
    #[must_use]
    pub fn deleted(&self) -> Vec<DeletedItem> {
        self.deleted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Search batches triggered so far.
    #[must_use]
    pub fn searches(&self) -> Vec<Vec<SearchItem>> {
        self.searches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl QueueProvider for FakeQueueProvider {
    fn instance_type(&self) -> InstanceType {
        self.instance_type
    }

    async fn get_queue_items(
        &self,
        instance: &ArrInstance,
        page: u32,
        page_size: u32,
    ) -> BackendResult<QueuePage> {
        self.page_requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((instance.name.clone(), page));
        if self
            .failing_instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&instance.name)
        {
            return Err(BackendError::Unauthorized {
                target: instance.name.clone(),
            });
        }

        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let size = page_size as usize;
        let start = (page.saturating_sub(1) as usize).saturating_mul(size);
        let slice = records.iter().skip(start).take(size).cloned().collect();
        Ok(QueuePage {
            page,
            page_size,
            total_records: records.len() as u64,
            records: slice,
        })
    }

    async fn delete_queue_item(
        &self,
        instance: &ArrInstance,
        record: &QueueRecord,
        remove_from_client: bool,
        reason: DeleteReason,
    ) -> BackendResult<()> {
        self.deleted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DeletedItem {
                instance: instance.name.clone(),
                download_id: record.download_id.clone(),
                remove_from_client,
                reason,
            });
        Ok(())
    }

    async fn search_items(&self, _instance: &ArrInstance, items: &[SearchItem]) -> BackendResult<()> {
        self.searches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(items.to_vec());
        Ok(())
    }
}

/// Mutating call observed by [`FakeDownloadService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    /// `skip_files`.
    SkipFiles {
        /// Download hash.
        hash: String,
        /// Skipped file indexes.
        indexes: Vec<usize>,
    },
    /// `create_category`.
    CreateCategory(String),
    /// `change_category`.
    ChangeCategory {
        /// Download hash.
        hash: String,
        /// Target category.
        category: String,
    },
    /// `add_tag`.
    AddTag {
        /// Download hash.
        hash: String,
        /// Added tag.
        tag: String,
    },
    /// `delete_download`.
    DeleteDownload {
        /// Download hash.
        hash: String,
        /// Data deletion was requested.
        delete_data: bool,
    },
}

/// In-memory download client.
pub struct FakeDownloadService {
    name: String,
    kind: DownloadClientKind,
    downloads: RwLock<HashMap<String, DownloadSnapshot>>,
    seeding: RwLock<Vec<SeedingDownload>>,
    login_fails: RwLock<bool>,
    lookup_fails: RwLock<bool>,
    category_fails: RwLock<bool>,
    calls: RwLock<Vec<ClientCall>>,
}

impl FakeDownloadService {
    /// Client without downloads.
    #[must_use]
    pub fn new(name: &str, kind: DownloadClientKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            downloads: RwLock::new(HashMap::new()),
            seeding: RwLock::new(Vec::new()),
            login_fails: RwLock::new(false),
            lookup_fails: RwLock::new(false),
            category_fails: RwLock::new(false),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Add or replace an in-flight download.
    pub fn put_download(&self, download: DownloadSnapshot) {
        self.downloads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(download.hash.to_ascii_lowercase(), download);
    }

    /// Replace the seeding downloads.
    pub fn set_seeding(&self, downloads: Vec<SeedingDownload>) {
        *self.seeding.write().unwrap_or_else(PoisonError::into_inner) = downloads;
    }

    /// Make `login` fail.
    pub fn fail_login(&self) {
        *self.login_fails.write().unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Make `get_download` and `get_seeding_downloads` fail.
    pub fn fail_lookups(&self) {
        *self.lookup_fails.write().unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Make `create_category` fail without recording the call.
    pub fn fail_category_creation(&self) {
        *self
            .category_fails
            .write()
            .unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Mutating calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: ClientCall) {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn check_lookup(&self, operation: &'static str) -> BackendResult<()> {
        if *self.lookup_fails.read().unwrap_or_else(PoisonError::into_inner) {
            return Err(BackendError::failed(operation, self.name.clone(), "client unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl DownloadService for FakeDownloadService {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DownloadClientKind {
        self.kind
    }

    async fn login(&self) -> BackendResult<()> {
        if *self.login_fails.read().unwrap_or_else(PoisonError::into_inner) {
            return Err(BackendError::Unauthorized {
                target: self.name.clone(),
            });
        }
        Ok(())
    }

    async fn get_download(&self, hash: &str) -> BackendResult<Option<DownloadSnapshot>> {
        self.check_lookup("download.get")?;
        Ok(self
            .downloads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&hash.to_ascii_lowercase())
            .cloned())
    }

    async fn skip_files(&self, hash: &str, indexes: &[usize]) -> BackendResult<()> {
        if let Some(download) = self
            .downloads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&hash.to_ascii_lowercase())
        {
            for file in &mut download.files {
                if indexes.contains(&file.index) {
                    file.skipped = true;
                }
            }
        }
        self.record(ClientCall::SkipFiles {
            hash: hash.to_string(),
            indexes: indexes.to_vec(),
        });
        Ok(())
    }

    async fn get_seeding_downloads(&self) -> BackendResult<Vec<SeedingDownload>> {
        self.check_lookup("download.seeding")?;
        Ok(self
            .seeding
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn create_category(&self, name: &str) -> BackendResult<()> {
        if *self.category_fails.read().unwrap_or_else(PoisonError::into_inner) {
            return Err(BackendError::failed(
                "download.create_category",
                self.name.clone(),
                "category rejected",
            ));
        }
        self.record(ClientCall::CreateCategory(name.to_string()));
        Ok(())
    }

    async fn change_category(&self, hash: &str, category: &str) -> BackendResult<()> {
        self.record(ClientCall::ChangeCategory {
            hash: hash.to_string(),
            category: category.to_string(),
        });
        Ok(())
    }

    async fn add_tag(&self, hash: &str, tag: &str) -> BackendResult<()> {
        self.record(ClientCall::AddTag {
            hash: hash.to_string(),
            tag: tag.to_string(),
        });
        Ok(())
    }

    async fn delete_download(&self, hash: &str, delete_data: bool) -> BackendResult<()> {
        self.record(ClientCall::DeleteDownload {
            hash: hash.to_string(),
            delete_data,
        });
        Ok(())
    }
}

/// Registry serving pre-built fakes.
#[derive(Default)]
pub struct FakeRegistry {
    providers: HashMap<InstanceType, Arc<FakeQueueProvider>>,
    services: HashMap<String, Arc<FakeDownloadService>>,
}

impl FakeRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `provider` for its instance type.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<FakeQueueProvider>) -> Self {
        self.providers.insert(provider.instance_type, provider);
        self
    }

    /// Serve `service` for the client configuration with the same name.
    #[must_use]
    pub fn with_service(mut self, service: Arc<FakeDownloadService>) -> Self {
        self.services.insert(service.name.to_ascii_lowercase(), service);
        self
    }
}

impl BackendRegistry for FakeRegistry {
    fn queue_provider(&self, instance_type: InstanceType) -> BackendResult<Arc<dyn QueueProvider>> {
        self.providers
            .get(&instance_type)
            .map(|provider| Arc::clone(provider) as Arc<dyn QueueProvider>)
            .ok_or_else(|| BackendError::NotRegistered {
                kind: instance_type.as_str().to_string(),
            })
    }

    fn download_service(
        &self,
        config: &DownloadClientConfig,
    ) -> BackendResult<Arc<dyn DownloadService>> {
        self.services
            .get(&config.name.to_ascii_lowercase())
            .map(|service| Arc::clone(service) as Arc<dyn DownloadService>)
            .ok_or_else(|| BackendError::NotRegistered {
                kind: config.kind.as_str().to_string(),
            })
    }
}
