//! Paginated queue iteration.
//!
//! Pages are requested from 1 until a short page, the reported total, or
//! cancellation ends the walk. Records are handed over as fetched; grouping
//! by download id is left to the caller.

use std::collections::HashMap;
use std::future::Future;

use culler_config::ArrInstance;
use culler_core::{QueueProvider, QueueRecord};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Pages through a provider's queue.
#[derive(Debug, Clone, Copy)]
pub struct QueueIterator {
    page_size: u32,
}

impl Default for QueueIterator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl QueueIterator {
    /// Create an iterator requesting `page_size` records per page.
    #[must_use]
    pub const fn new(page_size: u32) -> Self {
        Self {
            page_size: if page_size == 0 { 1 } else { page_size },
        }
    }

    /// Records requested per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Start paging through `instance`'s queue.
    #[must_use]
    pub const fn pages<'a>(
        &self,
        provider: &'a dyn QueueProvider,
        instance: &'a ArrInstance,
    ) -> QueuePager<'a> {
        QueuePager {
            provider,
            instance,
            page_size: self.page_size,
            next_page: 1,
            finished: false,
        }
    }

    /// Invoke `on_batch` for every non-empty page; returns the number of
    /// records delivered.
    ///
    /// # Errors
    ///
    /// Propagates provider failures, handler failures, and cancellation.
    pub async fn iterate<F, Fut>(
        &self,
        provider: &dyn QueueProvider,
        instance: &ArrInstance,
        cancel: &CancellationToken,
        mut on_batch: F,
    ) -> EngineResult<u64>
    where
        F: FnMut(Vec<QueueRecord>) -> Fut + Send,
        Fut: Future<Output = EngineResult<()>> + Send,
    {
        let mut pager = self.pages(provider, instance);
        let mut delivered = 0_u64;
        while let Some(batch) = pager.next_batch(cancel).await? {
            delivered += batch.len() as u64;
            on_batch(batch).await?;
        }
        Ok(delivered)
    }
}

/// Pull-based cursor over one instance's queue.
pub struct QueuePager<'a> {
    provider: &'a dyn QueueProvider,
    instance: &'a ArrInstance,
    page_size: u32,
    next_page: u32,
    finished: bool,
}

impl QueuePager<'_> {
    /// Fetch the next non-empty page, or `None` once the queue is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] when `cancel` fires and
    /// [`EngineError::Backend`] when the provider call fails.
    pub async fn next_batch(
        &mut self,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<Vec<QueueRecord>>> {
        if self.finished {
            return Ok(None);
        }
        if cancel.is_cancelled() {
            self.finished = true;
            return Err(EngineError::Cancelled);
        }

        let page = self.next_page;
        let fetched = tokio::select! {
            () = cancel.cancelled() => {
                self.finished = true;
                return Err(EngineError::Cancelled);
            }
            result = self.provider.get_queue_items(self.instance, page, self.page_size) => result,
        };
        let queue_page = fetched.map_err(|source| {
            self.finished = true;
            EngineError::backend("queue.fetch", self.instance.name.clone(), source)
        })?;

        let received = queue_page.records.len();
        let requested_so_far = u64::from(page) * u64::from(self.page_size);
        if received < self.page_size as usize || requested_so_far >= queue_page.total_records {
            self.finished = true;
        }
        self.next_page = page.saturating_add(1);
        debug!(
            instance = %self.instance.name,
            page,
            received,
            total = queue_page.total_records,
            "queue page fetched"
        );

        if queue_page.records.is_empty() {
            return Ok(None);
        }
        Ok(Some(queue_page.records))
    }
}

/// Group a batch by download id (case-insensitive), keeping first-seen order.
#[must_use]
pub fn group_by_download_id(records: Vec<QueueRecord>) -> Vec<Vec<QueueRecord>> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<QueueRecord>> = Vec::new();
    for record in records {
        let key = record.download_id.to_ascii_lowercase();
        if let Some(&position) = positions.get(&key) {
            groups[position].push(record);
        } else {
            positions.insert(key, groups.len());
            groups.push(vec![record]);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(download_id: &str, id: i64) -> QueueRecord {
        QueueRecord {
            id,
            download_id: download_id.into(),
            ..QueueRecord::default()
        }
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let groups = group_by_download_id(vec![
            record("B", 1),
            record("a", 2),
            record("b", 3),
            record("c", 4),
        ]);
        let ids: Vec<Vec<i64>> = groups
            .iter()
            .map(|group| group.iter().map(|record| record.id).collect())
            .collect();
        assert_eq!(ids, vec![vec![1, 3], vec![2], vec![4]]);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        assert_eq!(QueueIterator::new(0).page_size(), 1);
        assert_eq!(QueueIterator::default().page_size(), DEFAULT_PAGE_SIZE);
    }
}
