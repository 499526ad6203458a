//! # Background Jobs
//!
//! Two periodic tasks run beside the HTTP server:
//!
//! ```text
//! ┌──────────────────────┐  every notification_check_interval_minutes
//! │  notification scan   │──► re-evaluate every product, upsert alerts
//! └──────────────────────┘
//! ┌──────────────────────┐  every session_cleanup_interval_minutes
//! │  cleanup             │──► delete dead sessions and old read notifications
//! └──────────────────────┘
//! ```
//!
//! Both run once at startup (the first interval tick completes immediately)
//! and stop when [`Jobs::shutdown`] is called. A failed run is logged and
//! retried on the next tick.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::ApiConfig;
use pharmacy_db::{Database, DbResult};

use crate::services::alerts;

/// Rows removed by one cleanup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub sessions: u64,
    pub notifications: u64,
}

/// Scans the whole catalog for low-stock and expiry alerts.
pub async fn run_notification_scan(db: &Database) -> DbResult<usize> {
    alerts::scan_all(db, Utc::now().date_naive()).await
}

/// Deletes sessions that can no longer authenticate, plus read
/// notifications older than `retention_days`.
pub async fn run_cleanup(db: &Database, retention_days: i64) -> DbResult<CleanupReport> {
    let now = Utc::now();
    let sessions = db.sessions().cleanup(now).await?;
    let notifications = db.notifications().delete_old_read(retention_days, now).await?;

    if sessions > 0 || notifications > 0 {
        info!(sessions, notifications, "Cleanup removed stale rows");
    } else {
        debug!("Cleanup found nothing to remove");
    }
    Ok(CleanupReport {
        sessions,
        notifications,
    })
}

// =============================================================================
// Scheduler
// =============================================================================

/// Handle to the running jobs.
pub struct Jobs {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Jobs {
    /// Spawns both jobs on the current runtime.
    pub fn spawn(db: Database, config: &ApiConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let scan_db = db.clone();
        let scan = spawn_periodic(
            "notification-scan",
            minutes(config.notification_check_interval_minutes),
            shutdown_rx.clone(),
            move || {
                let db = scan_db.clone();
                async move { run_notification_scan(&db).await.map(|_| ()) }
            },
        );

        let retention_days = config.notification_retention_days;
        let cleanup = spawn_periodic(
            "cleanup",
            minutes(config.session_cleanup_interval_minutes),
            shutdown_rx,
            move || {
                let db = db.clone();
                async move { run_cleanup(&db, retention_days).await.map(|_| ()) }
            },
        );

        Jobs {
            shutdown_tx,
            handles: vec![scan, cleanup],
        }
    }

    /// Signals every job to stop and waits for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(?e, "Background job panicked");
            }
        }
    }
}

/// Zero would make `tokio::time::interval` panic.
fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.max(1) * 60)
}

fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    mut run: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = DbResult<()>> + Send,
{
    tokio::spawn(async move {
        info!(job = name, period_secs = period.as_secs(), "Background job starting");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = run().await {
                        error!(job = name, error = %e, "Background job failed");
                    }
                }

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!(job = name, "Background job stopped");
    })
}
