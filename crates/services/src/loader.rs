//! # Batched Metadata Loader
//!
//! Coalesces every `load` issued before the dispatcher task gets to run into
//! a single backend call per `max_batch_size` distinct identifiers, then fans
//! the response back out to each caller.
//!
//! The loader never caches: a lookup in a later batch always goes to the
//! backend again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::oneshot;
use tracing::debug;

use domains::{BackendError, ItemMetadata, MetadataBackend, RankingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Distinct identifiers per backend call.
    pub max_batch_size: usize,
    /// Extra time the dispatcher waits before draining the queue. Zero means
    /// a single scheduler yield.
    pub batch_delay: Duration,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_batch_size: 500,
            batch_delay: Duration::ZERO,
        }
    }
}

type Reply = std::result::Result<Option<ItemMetadata>, BackendError>;

struct Waiter {
    ncode: String,
    reply: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct PendingBatch {
    waiters: Vec<Waiter>,
    scheduled: bool,
}

/// Every caller asking for one identifier, in any casing.
struct Group {
    key: String,
    ncode: String,
    replies: Vec<oneshot::Sender<Reply>>,
}

struct LoaderInner {
    backend: Arc<dyn MetadataBackend>,
    options: LoaderOptions,
    pending: Mutex<PendingBatch>,
}

/// Cheap to clone; clones share the same pending batch.
///
/// Separate `load` calls coalesce when they are all issued before the
/// dispatcher's first poll. That holds on a current-thread runtime; on a
/// multi-thread runtime the dispatcher may run on another worker mid-burst,
/// so bursts there should go through [`MetadataLoader::load_many`].
#[derive(Clone)]
pub struct MetadataLoader {
    inner: Arc<LoaderInner>,
}

impl MetadataLoader {
    pub fn new(backend: Arc<dyn MetadataBackend>, options: LoaderOptions) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                backend,
                options: LoaderOptions {
                    max_batch_size: options.max_batch_size.max(1),
                    ..options
                },
                pending: Mutex::new(PendingBatch::default()),
            }),
        }
    }

    /// Metadata for `ncode`, or `None` if the backend does not know it.
    pub async fn load(&self, ncode: &str) -> Result<Option<ItemMetadata>> {
        let mut receivers = self.inner.enqueue_many(&[ncode]);
        match receivers.pop() {
            Some(receiver) => settle(receiver).await,
            None => Err(RankingError::BatchAborted),
        }
    }

    /// Loads every identifier in the same batch; results follow input order.
    ///
    /// The whole slice is queued under one lock, so it never straddles two
    /// dispatches, whatever runtime flavor drives the loader.
    pub async fn load_many<S: AsRef<str>>(&self, ncodes: &[S]) -> Vec<Result<Option<ItemMetadata>>> {
        let receivers = self.inner.enqueue_many(ncodes);
        join_all(receivers.into_iter().map(settle)).await
    }
}

async fn settle(receiver: oneshot::Receiver<Reply>) -> Result<Option<ItemMetadata>> {
    match receiver.await {
        Ok(reply) => reply.map_err(RankingError::from),
        Err(_) => Err(RankingError::BatchAborted),
    }
}

impl LoaderInner {
    fn lock_pending(&self) -> MutexGuard<'_, PendingBatch> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enqueue_many<S: AsRef<str>>(self: &Arc<Self>, ncodes: &[S]) -> Vec<oneshot::Receiver<Reply>> {
        if ncodes.is_empty() {
            return Vec::new();
        }

        let mut receivers = Vec::with_capacity(ncodes.len());
        let needs_dispatch = {
            let mut pending = self.lock_pending();
            for ncode in ncodes {
                let (reply, receiver) = oneshot::channel();
                pending.waiters.push(Waiter {
                    ncode: ncode.as_ref().to_string(),
                    reply,
                });
                receivers.push(receiver);
            }
            !std::mem::replace(&mut pending.scheduled, true)
        };

        // The batch runs detached so abandoned callers cannot cancel it
        if needs_dispatch {
            let inner = Arc::clone(self);
            tokio::spawn(async move { inner.dispatch().await });
        }
        receivers
    }

    async fn dispatch(&self) {
        if self.options.batch_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.options.batch_delay).await;
        }

        let waiters = {
            let mut pending = self.lock_pending();
            pending.scheduled = false;
            std::mem::take(&mut pending.waiters)
        };
        if waiters.is_empty() {
            return;
        }

        let callers = waiters.len();
        let batches = split_batches(group_waiters(waiters), self.options.max_batch_size);
        debug!(callers, calls = batches.len(), "dispatching metadata batch");

        join_all(batches.into_iter().map(|batch| self.resolve(batch))).await;
    }

    async fn resolve(&self, batch: Vec<Group>) {
        let ncodes: Vec<String> = batch.iter().map(|group| group.ncode.clone()).collect();

        match self.backend.fetch_metadata(&ncodes).await {
            Ok(items) => {
                let by_key: HashMap<String, ItemMetadata> = items
                    .into_iter()
                    .map(|item| (item.ncode.to_ascii_lowercase(), item))
                    .collect();
                let missing = batch.iter().filter(|group| !by_key.contains_key(&group.key)).count();
                debug!(requested = ncodes.len(), missing, "metadata batch resolved");

                for group in batch {
                    let found = by_key.get(&group.key);
                    for reply in group.replies {
                        // A dropped receiver means the caller lost interest
                        let _ = reply.send(Ok(found.cloned()));
                    }
                }
            }
            Err(err) => {
                debug!(requested = ncodes.len(), error = %err, "metadata batch failed");
                for group in batch {
                    for reply in group.replies {
                        let _ = reply.send(Err(err.clone()));
                    }
                }
            }
        }
    }
}

/// Folds identical identifiers (case-insensitively) into one group, keeping
/// first-seen order and the first caller's spelling.
fn group_waiters(waiters: Vec<Waiter>) -> Vec<Group> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for waiter in waiters {
        let key = waiter.ncode.to_ascii_lowercase();
        match index.get(&key) {
            Some(&position) => groups[position].replies.push(waiter.reply),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    ncode: waiter.ncode,
                    replies: vec![waiter.reply],
                });
            }
        }
    }
    groups
}

fn split_batches(groups: Vec<Group>, max_batch_size: usize) -> Vec<Vec<Group>> {
    let mut batches: Vec<Vec<Group>> = Vec::new();
    for group in groups {
        match batches.last_mut() {
            Some(batch) if batch.len() < max_batch_size => batch.push(group),
            _ => batches.push(vec![group]),
        }
    }
    batches
}
