//! Coordination of concurrent access-token refreshes
//!
//! Requests that hit `401` while a refresh is already running park here
//! instead of starting a second refresh. Each parked request gets a
//! monotonic id; when the leader settles, every waiter is resolved in id
//! order with the new token (or the failure). The state belongs to one
//! client instance.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// New access token, or the reason the refresh failed
pub type RefreshOutcome = std::result::Result<String, String>;

/// Arena of requests waiting on an in-flight refresh
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    next_id: u64,
    pending: BTreeMap<u64, oneshot::Sender<RefreshOutcome>>,
}

/// Role handed out by [`RefreshCoordinator::begin`]
pub enum RefreshTicket<'a> {
    /// Caller must perform the refresh and settle the lease
    Leader(RefreshLease<'a>),
    /// Caller waits for the leader's outcome
    Waiter(PendingRefresh<'a>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Become the refresh leader, or join the queue behind the current one
    pub fn begin(&self) -> RefreshTicket<'_> {
        let mut state = self.state.lock();
        if !state.refreshing {
            state.refreshing = true;
            return RefreshTicket::Leader(RefreshLease {
                coordinator: self,
                settled: false,
            });
        }

        let id = state.next_id;
        state.next_id += 1;
        let (tx, rx) = oneshot::channel();
        state.pending.insert(id, tx);
        tracing::debug!("Request {} queued behind token refresh", id);

        RefreshTicket::Waiter(PendingRefresh {
            coordinator: self,
            id,
            rx,
        })
    }

    /// Whether a refresh is in flight
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of parked requests
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// End the refresh and resolve waiters; returns their ids in resolution order
    fn settle(&self, outcome: RefreshOutcome) -> Vec<u64> {
        let pending = {
            let mut state = self.state.lock();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };

        let mut resolved = Vec::with_capacity(pending.len());
        for (id, tx) in pending {
            // A closed receiver means the waiter gave up
            if tx.send(outcome.clone()).is_ok() {
                resolved.push(id);
            }
        }
        resolved
    }

    fn forget(&self, id: u64) {
        self.state.lock().pending.remove(&id);
    }
}

/// Held by the request performing the refresh.
///
/// Dropping it unsettled fails every waiter so none is left hanging.
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    /// Publish the outcome; returns the waiter ids that received it
    pub fn settle(mut self, outcome: RefreshOutcome) -> Vec<u64> {
        self.settled = true;
        let resolved = self.coordinator.settle(outcome);
        if !resolved.is_empty() {
            tracing::debug!("Token refresh settled for {} queued requests", resolved.len());
        }
        resolved
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Token refresh abandoned before completion");
            self.coordinator.settle(Err("token refresh was abandoned".to_string()));
        }
    }
}

/// A request parked behind the current refresh
pub struct PendingRefresh<'a> {
    coordinator: &'a RefreshCoordinator,
    id: u64,
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl PendingRefresh<'_> {
    /// Position in the arena
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the leader's token
    pub async fn wait(mut self) -> Result<String> {
        match (&mut self.rx).await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(message)) => Err(Error::Auth(message)),
            Err(_) => Err(Error::auth("token refresh ended without a result")),
        }
    }
}

impl Drop for PendingRefresh<'_> {
    fn drop(&mut self) {
        self.coordinator.forget(self.id);
    }
}
