use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Keyed one-shot timers backing match and battle deadlines.
///
/// Scheduling the same key again replaces the previous timer, and a fired
/// timer removes its own slot. Each timer carries a generation number so a
/// stale task never removes its replacement.
#[derive(Clone, Default)]
pub struct DeadlineScheduler {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tasks: DashMap<Uuid, (u64, JoinHandle<()>)>,
    generations: AtomicU64,
}

impl DeadlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `callback` once `fire_at` passes. A deadline already in the past
    /// fires immediately.
    pub fn schedule<F, Fut>(&self, key: Uuid, fire_at: DateTime<Utc>, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let task = async move {
            let delay = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(delay).await;
            callback().await;
            inner
                .tasks
                .remove_if(&key, |_, (active, _)| *active == generation);
        };
        // The entry guard is held across the spawn so the task's own cleanup
        // cannot observe the slot before the new handle lands in it.
        let entry = self.inner.tasks.entry(key);
        let handle = tokio::spawn(task);
        match entry {
            Entry::Occupied(mut slot) => {
                let (_, old) = slot.insert((generation, handle));
                old.abort();
            }
            Entry::Vacant(slot) => {
                slot.insert((generation, handle));
            }
        }
    }

    /// Aborts the timer for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: Uuid) -> bool {
        if let Some((_, (_, handle))) = self.inner.tasks.remove(&key) {
            handle.abort();
            true
        } else {
            false
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.tasks.len()
    }
}
