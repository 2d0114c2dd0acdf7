//! Post resolution with a per-run cache and batch prefetching.
//!
//! The resolver owns the run's session state: the [`RemoteClient`] (and so
//! the rate limiter) plus the [`PostsCache`]. It is created once per run by
//! the pipeline and handed to the synchronizer by `&mut`.

use std::collections::HashMap;

use pooldl_core::{PoolId, PoolSummary, PostId, PostRecord};

use crate::api::{self, Endpoints};
use crate::client::{Fetch, RemoteClient};
use crate::error::{upstream_err, SyncError};
use crate::rate_limit::{Clock, SystemClock};

/// Most ids one batch lookup accepts.
pub const PREFETCH_LIMIT: usize = 100;

/// Result of resolving a single post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The post exists and its file is downloadable.
    Found(PostRecord),
    /// No post with that id exists upstream.
    Missing,
    /// The post exists but carries no file URL, usually because the content
    /// needs authentication.
    Fileless,
}

/// Write-once map of resolved posts. Lives for one run; never evicted.
#[derive(Debug, Default)]
pub struct PostsCache {
    records: HashMap<PostId, PostRecord>,
}

impl PostsCache {
    /// Insert `record` unless its id is already cached. Returns `true` if
    /// the record was stored.
    pub fn insert(&mut self, record: PostRecord) -> bool {
        match self.records.entry(record.id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub fn get(&self, id: PostId) -> Option<&PostRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Resolves pools and posts against the API.
#[derive(Debug)]
pub struct PostResolver<F: Fetch, C: Clock = SystemClock> {
    client: RemoteClient<F, C>,
    endpoints: Endpoints,
    cache: PostsCache,
}

impl<F: Fetch, C: Clock> PostResolver<F, C> {
    pub fn new(client: RemoteClient<F, C>, endpoints: Endpoints) -> Self {
        Self {
            client,
            endpoints,
            cache: PostsCache::default(),
        }
    }

    /// Look up a pool. `Ok(None)` is the "not found" outcome: the response
    /// was well-formed but held no posts.
    ///
    /// Pool lookups are never authenticated.
    pub fn resolve_pool(&mut self, id: PoolId) -> Result<Option<PoolSummary>, SyncError> {
        let url = self.endpoints.pool(id);
        let body = self.client.api_get(&url, false)?;
        let pool = api::decode_pool(&url, id, &body)?;
        match &pool {
            Some(p) => tracing::info!("pool {id}: '{}' with {} posts", p.name, p.post_ids.len()),
            None => tracing::info!("pool {id}: not found"),
        }
        Ok(pool)
    }

    /// Resolve up to [`PREFETCH_LIMIT`] posts in one request.
    ///
    /// Only records that carry file metadata are cached; the rest are left
    /// for [`resolve_post`](Self::resolve_post) to look up one by one, since
    /// the batch endpoint may omit or strip restricted content. Returns the
    /// number of newly cached records.
    pub fn prefetch(&mut self, ids: &[PostId]) -> Result<usize, SyncError> {
        if ids.len() > PREFETCH_LIMIT {
            return Err(SyncError::PrefetchOverflow {
                len: ids.len(),
                max: PREFETCH_LIMIT,
            });
        }
        if ids.is_empty() {
            return Ok(0);
        }

        let url = self.endpoints.posts(ids);
        let body = self.client.api_get(&url, true)?;
        let records = api::decode_posts(&url, &body)?;

        let mut cached = 0;
        for record in records {
            if record.file().is_none() {
                tracing::debug!("prefetch: post {} has no file metadata, deferring", record.id);
                continue;
            }
            if self.cache.insert(record) {
                cached += 1;
            }
        }
        tracing::debug!("prefetch: cached {cached} of {} requested posts", ids.len());
        Ok(cached)
    }

    /// Prefetch every id in chunks of [`PREFETCH_LIMIT`], in order.
    ///
    /// `on_page(page, pages)` is called before each chunk (1-based).
    pub fn prefetch_all<P>(&mut self, ids: &[PostId], mut on_page: P) -> Result<usize, SyncError>
    where
        P: FnMut(usize, usize),
    {
        let pages = ids.len().div_ceil(PREFETCH_LIMIT);
        let mut cached = 0;
        for (i, chunk) in ids.chunks(PREFETCH_LIMIT).enumerate() {
            on_page(i + 1, pages);
            cached += self.prefetch(chunk)?;
        }
        Ok(cached)
    }

    /// Resolve one post, from the cache if possible.
    pub fn resolve_post(&mut self, id: PostId) -> Result<Resolution, SyncError> {
        if let Some(record) = self.cache.get(id) {
            tracing::debug!("post {id}: cache hit");
            return Ok(Resolution::Found(record.clone()));
        }

        let url = self.endpoints.post(id);
        let body = self.client.api_get(&url, true)?;
        let mut records = api::decode_posts(&url, &body)?;

        match records.len() {
            0 => Ok(Resolution::Missing),
            1 => {
                let record = records.remove(0);
                if record.file().is_none() {
                    return Ok(Resolution::Fileless);
                }
                self.cache.insert(record.clone());
                Ok(Resolution::Found(record))
            }
            n => Err(upstream_err(&url, format!("expected at most one post, got {n}"))),
        }
    }

    pub fn client_mut(&mut self) -> &mut RemoteClient<F, C> {
        &mut self.client
    }

    pub fn client(&self) -> &RemoteClient<F, C> {
        &self.client
    }

    pub fn cache(&self) -> &PostsCache {
        &self.cache
    }
}
