//! Per-host registry of in-flight landing page resolutions.
//!
//! Concurrent requests for the same unresolved host share one CMS call.
//! Each waiter applies its own deadline and calls [`InflightResolutions::finish`]
//! when it stops waiting; the entry is removed by whichever waiter finishes
//! first, so a later request starts a fresh call. The shared call is dropped
//! (and its HTTP request aborted) once every waiter has given up.

use std::sync::atomic::{AtomicU64, Ordering};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::cms::ResolveError;

pub type ResolutionFuture = BoxFuture<'static, Result<Option<String>, ResolveError>>;
pub type SharedResolution = Shared<ResolutionFuture>;

/// A handle on a pending resolution.
pub struct PendingResolution {
    pub id: u64,
    /// True for the request that started the call.
    pub leader: bool,
    pub future: SharedResolution,
}

#[derive(Default)]
pub struct InflightResolutions {
    pending: DashMap<String, (u64, SharedResolution)>,
    next_id: AtomicU64,
}

impl InflightResolutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the pending resolution for `host`, or start one with `start`.
    pub fn join_or_start<F>(&self, host: &str, start: F) -> PendingResolution
    where
        F: FnOnce() -> ResolutionFuture,
    {
        match self.pending.entry(host.to_string()) {
            Entry::Occupied(entry) => {
                let (id, future) = entry.get();
                PendingResolution {
                    id: *id,
                    leader: false,
                    future: future.clone(),
                }
            }
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let future = start().shared();
                entry.insert((id, future.clone()));
                PendingResolution {
                    id,
                    leader: true,
                    future,
                }
            }
        }
    }

    /// Forget the resolution `id` for `host`, if it is still the registered one.
    pub fn finish(&self, host: &str, id: u64) {
        self.pending.remove_if(host, |_, (entry_id, _)| *entry_id == id);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
