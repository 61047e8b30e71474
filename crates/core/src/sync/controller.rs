//! Connectivity/lifecycle controller.
//!
//! Owns the process-wide offline state and is its only writer. The UI reads a
//! snapshot or subscribes to changes through a `watch` channel. Sync passes
//! are event-triggered only (network back online, app foregrounded, explicit
//! request); there is no timer.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use super::{DrainOutcome, RecoveryReport, SyncEngine};
use crate::errors::Result;
use crate::utils::now_rfc3339;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Bootstrapping,
    Ready,
}

/// Live offline status exposed to the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineStatus {
    pub lifecycle: Lifecycle,
    pub ready: bool,
    pub is_online: bool,
    pub syncing: bool,
    pub pending_mutations: i64,
    pub needs_review: i64,
    pub last_synced_at: Option<String>,
}

pub struct OfflineController {
    engine: Arc<SyncEngine>,
    status: watch::Sender<OfflineStatus>,
    /// Held for the whole duration of a drain pass.
    cycle_mutex: Mutex<()>,
}

impl OfflineController {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        let (status, _) = watch::channel(OfflineStatus::default());
        Self {
            engine,
            status,
            cycle_mutex: Mutex::new(()),
        }
    }

    pub fn status(&self) -> OfflineStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OfflineStatus> {
        self.status.subscribe()
    }

    /// Mount: recover interrupted state, read the pending count, become ready,
    /// then sync right away if the first reachability read says online.
    ///
    /// The database must already be open and migrated.
    pub async fn bootstrap(&self, initially_online: bool) -> Result<RecoveryReport> {
        self.status.send_modify(|status| {
            status.lifecycle = Lifecycle::Bootstrapping;
            status.is_online = initially_online;
        });

        let report = match self.prepare().await {
            Ok(value) => value,
            Err(err) => {
                self.status
                    .send_modify(|status| status.lifecycle = Lifecycle::Uninitialized);
                return Err(err);
            }
        };

        info!(
            "[OfflineSync] Ready (online={}, pending={})",
            initially_online,
            self.status.borrow().pending_mutations
        );

        if initially_online {
            self.sync_now().await;
        }
        Ok(report)
    }

    async fn prepare(&self) -> Result<RecoveryReport> {
        let report = self.engine.recover().await?;
        let pending = self.engine.pending_count()?;
        let needs_review = self.engine.needs_review_count()?;
        self.status.send_modify(|status| {
            status.pending_mutations = pending;
            status.needs_review = needs_review;
            status.lifecycle = Lifecycle::Ready;
            status.ready = true;
        });
        Ok(report)
    }

    /// Run one drain pass unless one is already in flight or the subsystem is
    /// not ready. Never fails: pass errors are logged and swallowed.
    pub async fn sync_now(&self) -> Option<DrainOutcome> {
        let Ok(_cycle_guard) = self.cycle_mutex.try_lock() else {
            debug!("[OfflineSync] Sync already in flight, ignoring trigger");
            return None;
        };
        if !self.status.borrow().ready {
            debug!("[OfflineSync] Not ready, ignoring sync trigger");
            return None;
        }

        self.status.send_modify(|status| status.syncing = true);
        let result = self.engine.run_drain_pass().await;

        let outcome = match result {
            Ok(outcome) => {
                let needs_review = self.engine.needs_review_count().unwrap_or_else(|err| {
                    warn!("[OfflineSync] Failed to count parked mutations: {}", err);
                    self.status.borrow().needs_review
                });
                let synced_at = now_rfc3339();
                self.status.send_modify(|status| {
                    status.pending_mutations = outcome.pending;
                    status.needs_review = needs_review;
                    status.last_synced_at = Some(synced_at);
                });
                Some(outcome)
            }
            Err(err) => {
                warn!("[OfflineSync] Drain pass failed: {}", err);
                None
            }
        };

        self.status.send_modify(|status| status.syncing = false);
        outcome
    }

    /// Reachability callback. Only an offline-to-online transition triggers a
    /// pass.
    pub async fn handle_network_change(&self, online: bool) -> Option<DrainOutcome> {
        let mut came_online = false;
        self.status.send_modify(|status| {
            came_online = online && !status.is_online;
            status.is_online = online;
        });

        if came_online {
            info!("[OfflineSync] Network back online");
            return self.sync_now().await;
        }
        None
    }

    /// App returned to the foreground.
    pub async fn handle_app_foreground(&self) -> Option<DrainOutcome> {
        if !self.status.borrow().is_online {
            return None;
        }
        self.sync_now().await
    }

    /// Re-read counters after a local write so the UI badge stays current.
    pub fn refresh_counts(&self) {
        match (self.engine.pending_count(), self.engine.needs_review_count()) {
            (Ok(pending), Ok(needs_review)) => self.status.send_modify(|status| {
                status.pending_mutations = pending;
                status.needs_review = needs_review;
            }),
            (Err(err), _) | (_, Err(err)) => {
                warn!("[OfflineSync] Failed to refresh queue counters: {}", err)
            }
        }
    }
}
