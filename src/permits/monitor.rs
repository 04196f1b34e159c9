use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::domain::{classify, days_left, LifecycleAction, Permit, PermitStatus};
use super::notify::{expired_today_message, expiring_soon_message, AlertGateway};
use super::store::{PermitStore, PermitUpdate, StoreError};

/// Cadence of the lifecycle monitor.
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    /// Pause between complete sweeps.
    pub sweep_interval: Duration,
    /// Pause before retrying after a failed permit fetch.
    pub retry_backoff: Duration,
}

/// Outcome counts of one full sweep, for logs and the one-shot CLI.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Permits whose dates parsed and that were classified.
    pub evaluated: usize,
    /// Permits for which stakeholder alerts were dispatched.
    pub notified: usize,
    /// Permits whose status label was persisted as expired.
    pub marked_expired: usize,
    /// Permits deleted after overrunning the grace period.
    pub purged: usize,
    /// Permits abandoned because of a per-record failure.
    pub skipped: usize,
}

#[derive(Debug, thiserror::Error)]
enum SweepRecordError {
    #[error(transparent)]
    Dates(#[from] super::domain::DateFieldError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("record carries no server-assigned id")]
    MissingId,
}

/// Periodic evaluator over the whole permit set. One instance runs per
/// process; its cadence alone serializes evaluation, so no record-level
/// locking exists anywhere.
pub struct LifecycleMonitor<S, N> {
    store: Arc<S>,
    alerts: Arc<N>,
    settings: MonitorSettings,
}

impl<S, N> LifecycleMonitor<S, N>
where
    S: PermitStore + 'static,
    N: AlertGateway + 'static,
{
    pub fn new(store: Arc<S>, alerts: Arc<N>, settings: MonitorSettings) -> Self {
        Self {
            store,
            alerts,
            settings,
        }
    }

    /// One full pass over the permit set at the given reference day.
    ///
    /// Returns an error only when the initial fetch fails; every per-record
    /// failure is logged with the record's identifier and absorbed so the
    /// rest of the set is still evaluated.
    pub async fn sweep(&self, today: NaiveDate) -> Result<SweepSummary, StoreError> {
        let permits = self.store.list_all().await?;
        let mut summary = SweepSummary::default();

        for permit in &permits {
            if let Err(err) = self.evaluate_record(permit, today, &mut summary).await {
                summary.skipped += 1;
                warn!(
                    permit = %record_ident(permit),
                    error = %err,
                    "record skipped during sweep"
                );
            }
        }

        Ok(summary)
    }

    async fn evaluate_record(
        &self,
        permit: &Permit,
        today: NaiveDate,
        summary: &mut SweepSummary,
    ) -> Result<(), SweepRecordError> {
        let window = permit.window()?;
        let class = classify(window, today);
        summary.evaluated += 1;
        debug!(permit = %record_ident(permit), class = class.label(), "record classified");

        match class.action() {
            LifecycleAction::None => {}
            LifecycleAction::Notify { urgent } => {
                let body = if urgent {
                    expired_today_message(permit)
                } else {
                    expiring_soon_message(permit, days_left(window.end, today), window.end)
                };
                self.dispatch_alerts(permit, &body).await;
                summary.notified += 1;
            }
            LifecycleAction::MarkExpired => {
                let id = permit.id.as_deref().ok_or(SweepRecordError::MissingId)?;
                self.store
                    .update(id, &PermitUpdate::status(PermitStatus::Expired))
                    .await?;
                summary.marked_expired += 1;
                info!(permit = %id, "permit marked expired, retained through grace period");
            }
            LifecycleAction::Purge => {
                let id = permit.id.as_deref().ok_or(SweepRecordError::MissingId)?;
                self.store.delete(id).await?;
                summary.purged += 1;
                info!(permit = %id, "permit unrenewed past grace period, record purged");
            }
        }

        Ok(())
    }

    /// Fire-and-forget fan-out to both stakeholders. A failed send is
    /// logged and the other stakeholder is still attempted.
    async fn dispatch_alerts(&self, permit: &Permit, body: &str) {
        let recipients = [
            ("leader", permit.leader_phone.as_str()),
            ("executor", permit.executor_phone.as_str()),
        ];

        for (role, phone) in recipients {
            if let Err(err) = self.alerts.send(phone, body).await {
                warn!(
                    permit = %record_ident(permit),
                    stakeholder = role,
                    error = %err,
                    "alert delivery failed"
                );
            }
        }
    }

    /// Long-lived loop: sweep, sleep, repeat, until the shutdown signal
    /// flips. A failed fetch shortens the pause to the retry backoff; no
    /// failure of any kind ends the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.settings.sweep_interval.as_secs(),
            "lifecycle monitor started"
        );

        loop {
            let today = Local::now().date_naive();
            let pause = match self.sweep(today).await {
                Ok(summary) => {
                    info!(
                        evaluated = summary.evaluated,
                        notified = summary.notified,
                        marked_expired = summary.marked_expired,
                        purged = summary.purged,
                        skipped = summary.skipped,
                        "sweep complete"
                    );
                    self.settings.sweep_interval
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        backoff_secs = self.settings.retry_backoff.as_secs(),
                        "permit fetch failed, sweep skipped"
                    );
                    self.settings.retry_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("lifecycle monitor stopping");
                        return;
                    }
                }
            }
        }
    }
}

fn record_ident(permit: &Permit) -> &str {
    permit.id.as_deref().unwrap_or(permit.area.as_str())
}
