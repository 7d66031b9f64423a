//! Optional collapsing of concurrent upstream fetches for the same probe.
//!
//! While a fetch for probe `id` is running, further scrapes for `id` wait on
//! the same slot instead of issuing their own request. A slot is removed as
//! soon as its fetch resolves, so results are never reused by later scrapes.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::error::ExporterError;
use crate::upstream::FetchOutcome;

pub type FetchResult = Result<FetchOutcome, ExporterError>;

type Slot = Arc<OnceCell<FetchResult>>;

#[derive(Default)]
pub struct InflightFetches {
    slots: DashMap<String, Slot>,
}

impl InflightFetches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of probes with a fetch currently in progress.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Runs `fetch` unless a fetch for `id` is already in flight, in which
    /// case its result is awaited instead. If the request driving the fetch is
    /// cancelled, one of the waiters starts its own fetch.
    pub async fn run<F, Fut>(&self, id: &str, fetch: F) -> FetchResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult>,
    {
        let slot = self.slots.entry(id.to_string()).or_default().clone();
        let guard = SlotGuard {
            slots: &self.slots,
            id,
            slot,
        };
        let result = guard.slot.get_or_init(fetch).await.clone();
        result
    }
}

/// Drops the slot from the map once it holds a result, or when the last
/// interested request goes away.
struct SlotGuard<'a> {
    slots: &'a DashMap<String, Slot>,
    id: &'a str,
    slot: Slot,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let slot = &self.slot;
        // map + this guard = 2
        self.slots.remove_if(self.id, |_, current| {
            Arc::ptr_eq(current, slot) && (slot.initialized() || Arc::strong_count(current) <= 2)
        });
    }
}
