//! Age-based eviction of stored files.
//!
//! Sweeps run on a single background worker fed by a bounded queue. Callers
//! only ever learn that a sweep was *requested*; outcomes are logged and
//! published on a watch channel, never returned to the trigger.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::storage::{Store, StoreError, SweepReport};

/// Default age after which entries are evicted.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Run one sweep over `store`, evicting entries at least `retention` old.
pub async fn sweep_once<S: Store + ?Sized>(store: &S, retention: Duration) -> SweepReport {
    let cutoff = SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let report = store.sweep(cutoff).await;

    if report.failed > 0 {
        warn!(
            scanned = report.scanned,
            removed = report.removed,
            abandoned = report.abandoned,
            failed = report.failed,
            "Sweep finished with failures"
        );
    } else {
        info!(
            scanned = report.scanned,
            removed = report.removed,
            abandoned = report.abandoned,
            "Sweep finished"
        );
    }
    report
}

/// Handle to the background sweep worker.
pub struct Evictor {
    requests: mpsc::Sender<()>,
    reports: watch::Receiver<Option<SweepReport>>,
    retention: Duration,
}

impl Evictor {
    /// Start the sweep worker. Must be called within a Tokio runtime.
    pub fn spawn<S: Store>(store: Arc<S>, retention: Duration) -> Self {
        // One queued request is enough: any later trigger is covered by it
        let (requests, mut rx) = mpsc::channel::<()>(1);
        let (report_tx, reports) = watch::channel(None);

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                let report = sweep_once(store.as_ref(), retention).await;
                report_tx.send_replace(Some(report));
            }
            debug!("Sweep worker stopped");
        });

        Self {
            requests,
            reports,
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Request a sweep without waiting for it.
    ///
    /// Coalesces with a sweep that is already queued. Fails only if the
    /// worker is no longer running.
    pub fn trigger(&self) -> Result<(), StoreError> {
        match self.requests.try_send(()) {
            Ok(()) => {
                debug!("Sweep requested");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("Sweep already pending");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(())) => Err(StoreError::SweepUnavailable),
        }
    }

    /// Request a sweep every `every`, starting immediately.
    pub fn schedule(&self, every: Duration) -> JoinHandle<()> {
        let requests = self.requests.clone();
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if requests.send(()).await.is_err() {
                    break;
                }
            }
        })
    }

    /// Watch the report of the most recent completed sweep.
    pub fn reports(&self) -> watch::Receiver<Option<SweepReport>> {
        self.reports.clone()
    }
}
