//! # Sync Schedule
//!
//! [`select_due_accounts`] decides which trusted accounts sync in a given UTC
//! hour; [`SyncScheduler`] is the background loop that runs the sweep once
//! per hour.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use metrics::{counter, histogram};
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::SchedulerConfig;
use crate::jobs::JobService;
use crate::models::trusted_account;

/// Accounts whose schedule is enabled and includes `hour`, in input order.
pub fn select_due_accounts(
    accounts: &[trusted_account::Model],
    hour: u8,
) -> Vec<&trusted_account::Model> {
    accounts
        .iter()
        .filter(|account| account.schedule().is_due(hour))
        .collect()
}

/// Background task that runs the sweep when a new UTC hour starts.
pub struct SyncScheduler {
    jobs: Arc<JobService>,
    config: SchedulerConfig,
    last_swept: Option<(NaiveDate, u32)>,
}

impl SyncScheduler {
    pub fn new(jobs: Arc<JobService>, config: SchedulerConfig) -> Self {
        Self {
            jobs,
            config,
            last_swept: None,
        }
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            tick_interval_seconds = self.config.tick_interval_seconds,
            "Starting sync scheduler"
        );
        let tick_interval = TokioDuration::from_secs(self.config.tick_interval_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Sync scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    self.tick(Utc::now()).await;
                }
            }
        }

        info!("Sync scheduler stopped");
    }

    /// Sweeps if `now` falls in an hour not swept yet; returns whether it did.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> bool {
        let slot = (now.date_naive(), now.hour());
        if self.last_swept == Some(slot) {
            debug!("hour already swept");
            return false;
        }
        // claimed before the sweep so a failing sweep is not retried every tick
        self.last_swept = Some(slot);

        let started = Instant::now();
        counter!("account_sync_scheduler_ticks_total").increment(1);
        if let Err(err) = self
            .jobs
            .create_jobs_by_trusted_account(Some(now.hour() as u8))
            .await
        {
            error!(error = %err, "Scheduler sweep failed");
        }
        histogram!("account_sync_scheduler_tick_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1_000.0);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn account(enabled: bool, hours: serde_json::Value) -> trusted_account::Model {
        let now = Utc::now().fixed_offset();
        trusted_account::Model {
            id: Uuid::new_v4(),
            domain_id: "domain-1".into(),
            workspace_id: None,
            resource_group: "DOMAIN".into(),
            name: "aws-org".into(),
            provider: "aws".into(),
            secret_schema_id: "aws_access_key".into(),
            trusted_secret_id: None,
            schedule_enabled: enabled,
            schedule_hours: hours,
            sync_options: None,
            plugin_options: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_due_accounts_match_enabled_hour() {
        let accounts = vec![
            account(true, json!([1, 5, 9])),
            account(true, json!([2])),
            account(false, json!([5])),
            account(true, json!([5, 5])),
        ];

        let due = select_due_accounts(&accounts, 5);
        let ids: Vec<Uuid> = due.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![accounts[0].id, accounts[3].id]);
    }

    #[test]
    fn test_malformed_hours_never_due() {
        let accounts = vec![account(true, json!("5")), account(true, json!([null, "5"]))];
        assert!(select_due_accounts(&accounts, 5).is_empty());
    }

    #[test]
    fn test_every_hour_selects_each_account_once() {
        let accounts = vec![account(true, json!((0..24).collect::<Vec<u8>>()))];
        for hour in 0..24 {
            assert_eq!(select_due_accounts(&accounts, hour).len(), 1);
        }
        assert!(select_due_accounts(&accounts, 24).is_empty());
    }
}
