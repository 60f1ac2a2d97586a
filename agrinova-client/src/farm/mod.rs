//! Reads and writes of farm data, always scoped to one organization.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use agrinova_shared::pagination::Page;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::backend::{Backend, DataStore, ObjectStorage, WeatherProvider};
use crate::error::ClientResult;
use crate::util::cache::QueryCache;
use crate::util::cancel::cancellable;

pub mod inventory;
pub mod photos;
pub mod reports;
pub mod weather;
pub mod workers;

pub use inventory::InventoryInput;
pub use reports::ReportInput;

/// Handle for organization-scoped data access.
///
/// Clones share the read cache and the cancellation token; [`FarmData::child`]
/// shares the cache but gets its own token, cancelled along with the parent.
#[derive(Clone)]
pub struct FarmData {
    data: Arc<dyn DataStore>,
    storage: Arc<dyn ObjectStorage>,
    weather: Arc<dyn WeatherProvider>,
    cache: Arc<QueryCache>,
    cancel: CancellationToken,
}

impl FarmData {
    pub fn new(backend: &Backend, cache_ttl: Duration) -> Self {
        Self {
            data: backend.data.clone(),
            storage: backend.storage.clone(),
            weather: backend.weather.clone(),
            cache: Arc::new(QueryCache::new(cache_ttl)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            ..self.clone()
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Makes every in-flight and future call on this handle (and its
    /// children) return `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Forgets every cached listing, e.g. after the user changes.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn run<T, F>(&self, fut: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        cancellable(&self.cancel, fut).await
    }

    /// Requests full pages until one comes back short.
    async fn fetch_all_pages<T, F, Fut>(&self, mut fetch: F) -> ClientResult<Vec<T>>
    where
        F: FnMut(Page) -> Fut,
        Fut: Future<Output = ClientResult<Vec<T>>>,
    {
        let mut rows = Vec::new();
        let mut page = Page::max_limit();
        loop {
            let batch = self.run(fetch(page)).await?;
            let done = batch.len() < page.limit() as usize;
            rows.extend(batch);
            if done {
                return Ok(rows);
            }
            page = page.next();
        }
    }
}

/// Drops rows that belong to another organization than `scope`.
fn retain_scoped<T>(
    rows: Vec<T>,
    scope: &str,
    collection: &'static str,
    organization_of: impl Fn(&T) -> &str,
) -> Vec<T> {
    let before = rows.len();
    let kept: Vec<T> = rows
        .into_iter()
        .filter(|row| organization_of(row) == scope)
        .collect();
    if kept.len() != before {
        warn!(
            collection,
            scope,
            dropped = before - kept.len(),
            "dropped rows from another organization"
        );
    }
    kept
}
