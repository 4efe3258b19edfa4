use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::CleanupConfig;
use crate::infra::{cache::RedisCache, db::Db, lock::DistributedLock};
use crate::jobs::notification_cleanup::{
    clean_up_notifications, Clock, NotificationStore, PgNotificationStore, SystemClock,
};

const CLEANUP_LOCK_NAME: &str = "notification-cleanup";

#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(usize),
    Skipped,
    TimedOut,
    Failed,
}

/// Runs the notification cleanup at every fire time of the configured cron
/// schedule until the task is dropped.
pub async fn run(db: Db, cache: RedisCache, config: CleanupConfig) -> Result<()> {
    let schedule = config.schedule()?;
    let store = PgNotificationStore::new(db);
    let lock = DistributedLock::new(cache);

    info!(
        cron = %config.cron,
        lock_at_most_seconds = config.lock_at_most_seconds,
        max_execution_seconds = config.max_execution_seconds,
        "notification cleanup scheduler started"
    );

    loop {
        let now = Utc::now();
        let Some(delay) = delay_until_next(&schedule, now) else {
            return Err(anyhow!(
                "notification cleanup schedule '{}' has no upcoming run",
                config.cron
            ));
        };
        debug!(delay_seconds = delay.as_secs(), "next notification cleanup scheduled");
        tokio::time::sleep(delay).await;
        run_once(&store, &SystemClock, &lock, &config).await;
    }
}

/// Time left from `now` until the schedule next fires.
pub fn delay_until_next(schedule: &Schedule, now: DateTime<Utc>) -> Option<Duration> {
    let next = schedule.after(&now).next()?;
    Some((next - now).to_std().unwrap_or(Duration::ZERO))
}

/// One locked, time-limited cleanup run. Never returns an error: every
/// failure is logged and reported through the outcome.
pub async fn run_once<S, C>(
    store: &S,
    clock: &C,
    lock: &DistributedLock,
    config: &CleanupConfig,
) -> RunOutcome
where
    S: NotificationStore,
    C: Clock,
{
    let guard = match lock
        .try_acquire(
            CLEANUP_LOCK_NAME,
            Duration::from_secs(config.lock_at_most_seconds),
        )
        .await
    {
        Ok(Some(guard)) => guard,
        Ok(None) => {
            info!("notification cleanup already running elsewhere, skipping");
            return RunOutcome::Skipped;
        }
        Err(err) => {
            warn!(error = ?err, "failed to acquire notification cleanup lock");
            return RunOutcome::Failed;
        }
    };

    let outcome = match tokio::time::timeout(
        Duration::from_secs(config.max_execution_seconds),
        clean_up_notifications(store, clock),
    )
    .await
    {
        Ok(Ok(deleted)) => RunOutcome::Completed(deleted.len()),
        Ok(Err(err)) => {
            error!(error = ?err, "notification cleanup failed");
            RunOutcome::Failed
        }
        Err(_) => {
            error!(
                max_execution_seconds = config.max_execution_seconds,
                "notification cleanup exceeded its execution limit"
            );
            RunOutcome::TimedOut
        }
    };

    match lock.release(guard).await {
        Ok(true) => {}
        Ok(false) => warn!("notification cleanup lock expired before release"),
        Err(err) => warn!(error = ?err, "failed to release notification cleanup lock"),
    }

    outcome
}
