//! # In-memory Page Cache
//!
//! `PageCache` backed by a `DashMap`. Entries go stale after a fixed window
//! and the map is bounded; concurrent misses for one key share a single
//! backend fetch.
//!
//! ## Developer Note
//! A key moves `Loading -> Ready` on success and is removed on failure, so
//! errors are never cached. If the task leading a fetch is dropped midway,
//! its guard clears the `Loading` slot and one of the waiters takes over with
//! its own fetch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace};

use domains::{BackendError, PageCache, PageFetch, PageKey, SharedPage};

type Outcome = Result<SharedPage, BackendError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// How long a fetched chunk is served before it is fetched again.
    pub ttl: Duration,
    /// Upper bound on ready entries kept.
    pub max_entries: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_entries: 1024,
        }
    }
}

enum Slot {
    Ready { page: SharedPage, fetched_at: Instant },
    Loading(Vec<oneshot::Sender<Outcome>>),
}

enum Claim {
    Hit(SharedPage),
    Wait(oneshot::Receiver<Outcome>),
    Lead,
}

pub struct InMemoryPageCache {
    entries: DashMap<PageKey, Slot>,
    options: CacheOptions,
}

impl InMemoryPageCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            entries: DashMap::new(),
            options,
        }
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    fn claim(&self, key: &PageKey) -> Claim {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if let Slot::Loading(waiters) = occupied.get_mut() {
                    let (reply, receiver) = oneshot::channel();
                    waiters.push(reply);
                    return Claim::Wait(receiver);
                }
                if let Slot::Ready { page, fetched_at } = occupied.get() {
                    if fetched_at.elapsed() < self.options.ttl {
                        return Claim::Hit(Arc::clone(page));
                    }
                }
                occupied.insert(Slot::Loading(Vec::new()));
                Claim::Lead
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Loading(Vec::new()));
                Claim::Lead
            }
        }
    }

    fn publish(&self, key: &PageKey, outcome: &Outcome) {
        let waiters = match outcome {
            Ok(page) => {
                let ready = Slot::Ready {
                    page: Arc::clone(page),
                    fetched_at: Instant::now(),
                };
                match self.entries.insert(key.clone(), ready) {
                    Some(Slot::Loading(waiters)) => waiters,
                    _ => Vec::new(),
                }
            }
            Err(_) => match self.entries.remove(key) {
                Some((_, Slot::Loading(waiters))) => waiters,
                _ => Vec::new(),
            },
        };

        for reply in waiters {
            let _ = reply.send(outcome.clone());
        }
        if outcome.is_ok() {
            self.enforce_capacity();
        }
    }

    /// Drops stale entries first, then the oldest ready ones.
    fn enforce_capacity(&self) {
        if self.ready_len() <= self.options.max_entries {
            return;
        }
        let ttl = self.options.ttl;
        self.entries.retain(|_, slot| match slot {
            Slot::Ready { fetched_at, .. } => fetched_at.elapsed() < ttl,
            Slot::Loading(_) => true,
        });

        while self.ready_len() > self.options.max_entries {
            let oldest = self
                .entries
                .iter()
                .filter_map(|entry| match entry.value() {
                    Slot::Ready { fetched_at, .. } => Some((*fetched_at, entry.key().clone())),
                    Slot::Loading(_) => None,
                })
                .min_by_key(|(fetched_at, _)| *fetched_at);
            let Some((_, key)) = oldest else { break };
            self.entries.remove(&key);
            debug!(backend_page = key.backend_page, "evicted oldest page");
        }
    }

    fn ready_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Ready { .. }))
            .count()
    }
}

impl Default for InMemoryPageCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

/// Clears a `Loading` slot whose leader went away before publishing.
struct LoadingGuard<'a> {
    entries: &'a DashMap<PageKey, Slot>,
    key: &'a PageKey,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.entries
                .remove_if(self.key, |_, slot| matches!(slot, Slot::Loading(_)));
        }
    }
}

#[async_trait]
impl PageCache for InMemoryPageCache {
    async fn get_or_fetch(&self, key: PageKey, fetch: PageFetch<'_>) -> Result<SharedPage, BackendError> {
        loop {
            match self.claim(&key) {
                Claim::Hit(page) => {
                    trace!(backend_page = key.backend_page, "page cache hit");
                    return Ok(page);
                }
                Claim::Wait(receiver) => {
                    // A closed channel means the leader was dropped; claim again
                    if let Ok(outcome) = receiver.await {
                        return outcome;
                    }
                }
                Claim::Lead => break,
            }
        }

        trace!(backend_page = key.backend_page, "page cache miss");
        let mut guard = LoadingGuard {
            entries: &self.entries,
            key: &key,
            armed: true,
        };
        let outcome = fetch.await.map(Arc::new);
        guard.armed = false;
        drop(guard);

        self.publish(&key, &outcome);
        outcome
    }

    fn evict(&self, key: &PageKey) {
        self.entries
            .remove_if(key, |_, slot| matches!(slot, Slot::Ready { .. }));
    }

    fn clear(&self) {
        self.entries.retain(|_, slot| matches!(slot, Slot::Loading(_)));
    }

    fn len(&self) -> usize {
        self.ready_len()
    }
}
