//! Trigger evaluation and the run loop
//!
//! The scheduler ticks on a fixed interval, asks the registry for every
//! definition, and launches the ones whose trigger is due. Only `Interval`
//! and `Cron` triggers ever fire here; `Manual` and `None` tasks run solely
//! through [`TaskScheduler::trigger_now`].
//!
//! There is no backfill: the first automatic run is the first trigger
//! occurrence at or after both "now" and the task's scheduled_start.

use crate::error::{AppError, Result};
use crate::kubernetes::{LaunchReceipt, Launcher};
use crate::registry::TaskRegistry;
use crate::task::Trigger;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

/// Compute the first trigger occurrence strictly after `after`, never
/// earlier than `scheduled_start`. `Manual` and `None` have no occurrences.
pub fn next_run_after(
    trigger: &Trigger,
    scheduled_start: DateTime<Utc>,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    // Clamp so no occurrence can land before scheduled_start.
    let effective_after = after.max(scheduled_start - ChronoDuration::seconds(1));

    match trigger {
        Trigger::Manual | Trigger::None => None,
        Trigger::Interval { every_seconds } => {
            let period = *every_seconds as i64;
            if effective_after < scheduled_start {
                return Some(scheduled_start);
            }
            // Occurrences are anchored at scheduled_start.
            let elapsed = (effective_after - scheduled_start).num_seconds();
            let k = elapsed / period + 1;
            Some(scheduled_start + ChronoDuration::seconds(k * period))
        }
        Trigger::Cron { expression } => Some(next_cron_occurrence(expression, effective_after)),
    }
}

/// Next occurrence of a recognized cron expression, strictly after `after`.
///
/// Unrecognized expressions fall back to one hour out, with a warning.
fn next_cron_occurrence(expression: &str, after: DateTime<Utc>) -> DateTime<Utc> {
    match expression.trim() {
        // Every hour, on the hour
        "0 * * * *" => next_period_boundary(after, 3_600),
        // Daily at midnight UTC
        "0 0 * * *" => next_period_boundary(after, 86_400),
        // Weekly on Sunday at midnight UTC
        "0 0 * * 0" => {
            let mut candidate = next_period_boundary(after, 86_400);
            while weekday_of(candidate) != 0 {
                candidate += ChronoDuration::days(1);
            }
            candidate
        }
        other => {
            warn!("⚠️ Unsupported cron expression: {}", other);
            after + ChronoDuration::hours(1)
        }
    }
}

/// First multiple of `period_seconds` (counted from the Unix epoch) strictly
/// after `after`.
fn next_period_boundary(after: DateTime<Utc>, period_seconds: i64) -> DateTime<Utc> {
    let ts = after.timestamp();
    let next = ts - ts.rem_euclid(period_seconds) + period_seconds;
    DateTime::from_timestamp(next, 0).expect("valid timestamp")
}

/// Day of week with 0 = Sunday (the epoch, 1970-01-01, was a Thursday)
fn weekday_of(at: DateTime<Utc>) -> i64 {
    let days = at.timestamp().div_euclid(86_400);
    (days + 4).rem_euclid(7)
}

#[derive(Debug, Clone)]
struct ScheduledTask {
    trigger: Trigger,
    scheduled_start: DateTime<Utc>,
    next_run: DateTime<Utc>,
}

/// Scheduler over a registry and a launcher
#[derive(Clone)]
pub struct TaskScheduler {
    registry: TaskRegistry,
    launcher: Arc<dyn Launcher>,
    scheduled: Arc<RwLock<HashMap<String, ScheduledTask>>>,
}

impl TaskScheduler {
    pub fn new(registry: TaskRegistry, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            registry,
            launcher,
            scheduled: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start the tick loop
    pub fn start(&self, tick: Duration) {
        info!("🕐 Starting task scheduler (tick: {:?})", tick);

        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(tick);
            loop {
                ticker.tick().await;
                scheduler.tick_once(Utc::now()).await;
            }
        });
    }

    /// Evaluate every registered task against `now`, launching the due ones.
    ///
    /// Taking `now` as a parameter keeps the trigger logic testable without
    /// a running clock.
    pub async fn tick_once(&self, now: DateTime<Utc>) -> Vec<LaunchReceipt> {
        let descriptors = self.registry.list().await;
        let mut due = Vec::new();

        {
            let mut scheduled = self.scheduled.write().await;

            // Drop state for tasks that left the registry.
            scheduled.retain(|identifier, _| {
                descriptors.iter().any(|d| &d.identifier == identifier)
            });

            for descriptor in &descriptors {
                if !descriptor.trigger.is_automatic() {
                    continue;
                }

                let Some(next) =
                    next_run_after(&descriptor.trigger, descriptor.scheduled_start, now)
                else {
                    continue;
                };

                let entry = scheduled
                    .entry(descriptor.identifier.clone())
                    .or_insert_with(|| ScheduledTask {
                        trigger: descriptor.trigger.clone(),
                        scheduled_start: descriptor.scheduled_start,
                        next_run: next,
                    });

                // A rescan may have swapped the trigger or start date out
                // from under the armed occurrence: re-arm from the new ones.
                if entry.trigger != descriptor.trigger
                    || entry.scheduled_start != descriptor.scheduled_start
                {
                    entry.trigger = descriptor.trigger.clone();
                    entry.scheduled_start = descriptor.scheduled_start;
                    entry.next_run = next;
                }

                if entry.next_run <= now {
                    due.push(descriptor.clone());
                    entry.next_run = next;
                }
            }
        }

        let mut receipts = Vec::new();
        for descriptor in due {
            info!("⏰ Triggering scheduled task: {}", descriptor.identifier);
            match self.launcher.launch(&descriptor).await {
                Ok(receipt) => {
                    info!(
                        "✅ Scheduled task launched: {} (job: {})",
                        descriptor.identifier, receipt.job_name
                    );
                    receipts.push(receipt);
                }
                Err(e) => {
                    error!(
                        "❌ Failed to launch scheduled task {}: {}",
                        descriptor.identifier, e
                    );
                }
            }
        }

        receipts
    }

    /// Explicit external invocation, allowed for every trigger kind
    /// including `Manual` and `None`.
    pub async fn trigger_now(&self, identifier: &str) -> Result<LaunchReceipt> {
        let descriptor = self.registry.get(identifier).await.ok_or_else(|| {
            AppError::NotFound(format!("Task not registered: {}", identifier))
        })?;

        info!("▶️ Manually triggering task: {}", identifier);
        self.launcher.launch(&descriptor).await
    }

    /// Next planned automatic run for a task, if it has one
    pub async fn next_run(&self, identifier: &str) -> Option<DateTime<Utc>> {
        self.scheduled
            .read()
            .await
            .get(identifier)
            .map(|s| s.next_run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDescriptor;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_manual_and_none_never_have_a_next_run() {
        let start = at(2026, 1, 1, 0, 0, 0);
        // Advance the reference clock arbitrarily far: still nothing.
        for years in [0, 1, 10, 100] {
            let after = at(2026 + years, 6, 1, 12, 0, 0);
            assert_eq!(next_run_after(&Trigger::None, start, after), None);
            assert_eq!(next_run_after(&Trigger::Manual, start, after), None);
        }
    }

    #[test]
    fn test_interval_is_anchored_at_scheduled_start() {
        let start = at(2026, 1, 1, 0, 0, 0);
        let trigger = Trigger::Interval { every_seconds: 3_600 };

        let next = next_run_after(&trigger, start, at(2026, 1, 1, 0, 30, 0)).unwrap();
        assert_eq!(next, at(2026, 1, 1, 1, 0, 0));

        // Exactly on an occurrence: the next one is a full period later.
        let next = next_run_after(&trigger, start, at(2026, 1, 1, 1, 0, 0)).unwrap();
        assert_eq!(next, at(2026, 1, 1, 2, 0, 0));
    }

    #[test]
    fn test_future_start_delays_first_run_without_backfill() {
        let start = at(2026, 1, 1, 0, 0, 0);
        let trigger = Trigger::Interval { every_seconds: 60 };

        // Long before the start date: the first run is the start itself,
        // and nothing from before it is owed.
        let next = next_run_after(&trigger, start, at(2025, 3, 1, 0, 0, 0)).unwrap();
        assert_eq!(next, start);
    }

    #[test]
    fn test_cron_hourly_daily_weekly() {
        let start = at(2020, 1, 1, 0, 0, 0);

        let hourly = Trigger::Cron { expression: "0 * * * *".to_string() };
        assert_eq!(
            next_run_after(&hourly, start, at(2026, 3, 5, 13, 30, 0)).unwrap(),
            at(2026, 3, 5, 14, 0, 0)
        );

        let daily = Trigger::Cron { expression: "0 0 * * *".to_string() };
        assert_eq!(
            next_run_after(&daily, start, at(2026, 3, 5, 13, 30, 0)).unwrap(),
            at(2026, 3, 6, 0, 0, 0)
        );

        // 2026-01-01 is a Thursday; the next Sunday is 2026-01-04.
        let weekly = Trigger::Cron { expression: "0 0 * * 0".to_string() };
        assert_eq!(
            next_run_after(&weekly, start, at(2026, 1, 1, 12, 0, 0)).unwrap(),
            at(2026, 1, 4, 0, 0, 0)
        );
    }

    #[test]
    fn test_cron_respects_scheduled_start() {
        let start = at(2026, 1, 1, 0, 0, 0);
        let daily = Trigger::Cron { expression: "0 0 * * *".to_string() };

        let next = next_run_after(&daily, start, at(2025, 6, 1, 0, 0, 0)).unwrap();
        assert_eq!(next, start);
    }

    #[test]
    fn test_unsupported_cron_falls_back_an_hour_out() {
        let start = at(2020, 1, 1, 0, 0, 0);
        let odd = Trigger::Cron { expression: "*/5 * * * *".to_string() };
        let after = at(2026, 3, 5, 13, 30, 0);
        assert_eq!(next_run_after(&odd, start, after).unwrap(), after + ChronoDuration::hours(1));
    }

    /// Launcher that only counts invocations
    struct CountingLauncher {
        count: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Launcher for CountingLauncher {
        async fn launch(&self, descriptor: &TaskDescriptor) -> Result<LaunchReceipt> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(LaunchReceipt {
                task_identifier: descriptor.identifier.clone(),
                job_name: format!("test-{}", descriptor.identifier),
                submitted_at: Utc::now(),
            })
        }
    }

    async fn scheduler_with_counter() -> (TaskScheduler, Arc<CountingLauncher>) {
        let registry = TaskRegistry::new();
        let launcher = Arc::new(CountingLauncher { count: AtomicUsize::new(0) });
        (TaskScheduler::new(registry, launcher.clone()), launcher)
    }

    fn git_sync_like(trigger: Trigger) -> TaskDescriptor {
        TaskDescriptor::builder("example_pod_with_git_sync")
            .owner("airflow")
            .scheduled_start(at(2026, 1, 1, 0, 0, 0))
            .trigger(trigger)
            .image("myacr.azurecr.io/airflow-dag:latest")
            .command(["python", "/opt/airflow/dags/project_1/dag_1.py"])
            .namespace("airflow")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_none_trigger_is_never_auto_triggered() {
        let (scheduler, launcher) = scheduler_with_counter().await;
        scheduler
            .registry
            .register(git_sync_like(Trigger::None))
            .await
            .unwrap();

        // Advance the clock arbitrarily across ticks: zero automatic runs.
        for years in 0..50 {
            scheduler.tick_once(at(2026 + years, 7, 1, 3, 0, 0)).await;
        }
        assert_eq!(launcher.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_interval_task_fires_once_per_period() {
        let (scheduler, launcher) = scheduler_with_counter().await;
        scheduler
            .registry
            .register(git_sync_like(Trigger::Interval { every_seconds: 3_600 }))
            .await
            .unwrap();

        // First tick arms the schedule; nothing is due yet.
        let receipts = scheduler.tick_once(at(2026, 1, 1, 0, 30, 0)).await;
        assert!(receipts.is_empty());

        // Past the armed occurrence: exactly one launch.
        let receipts = scheduler.tick_once(at(2026, 1, 1, 1, 0, 30)).await;
        assert_eq!(receipts.len(), 1);
        assert_eq!(
            scheduler.next_run("example_pod_with_git_sync").await,
            Some(at(2026, 1, 1, 2, 0, 0))
        );

        // Same period again: nothing more.
        let receipts = scheduler.tick_once(at(2026, 1, 1, 1, 5, 0)).await;
        assert!(receipts.is_empty());

        assert_eq!(launcher.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_replaced_trigger_rearms_the_schedule() {
        let (scheduler, launcher) = scheduler_with_counter().await;
        scheduler
            .registry
            .register(git_sync_like(Trigger::Interval { every_seconds: 3_600 }))
            .await
            .unwrap();

        // Arm under the hourly trigger.
        scheduler.tick_once(at(2026, 1, 1, 0, 30, 0)).await;
        assert_eq!(
            scheduler.next_run("example_pod_with_git_sync").await,
            Some(at(2026, 1, 1, 1, 0, 0))
        );

        // A rescan swaps in a ten-minute interval: the armed occurrence
        // follows the new trigger instead of holding until the old one fires.
        scheduler
            .registry
            .replace(git_sync_like(Trigger::Interval { every_seconds: 600 }))
            .await;
        let receipts = scheduler.tick_once(at(2026, 1, 1, 0, 31, 0)).await;
        assert!(receipts.is_empty());
        assert_eq!(
            scheduler.next_run("example_pod_with_git_sync").await,
            Some(at(2026, 1, 1, 0, 40, 0))
        );

        let receipts = scheduler.tick_once(at(2026, 1, 1, 0, 41, 0)).await;
        assert_eq!(receipts.len(), 1);
        assert_eq!(launcher.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_trigger_now_runs_none_trigger_tasks() {
        let (scheduler, launcher) = scheduler_with_counter().await;
        scheduler
            .registry
            .register(git_sync_like(Trigger::None))
            .await
            .unwrap();

        let receipt = scheduler.trigger_now("example_pod_with_git_sync").await.unwrap();
        assert_eq!(receipt.task_identifier, "example_pod_with_git_sync");
        assert_eq!(launcher.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_trigger_now_unknown_task() {
        let (scheduler, _) = scheduler_with_counter().await;
        assert!(matches!(
            scheduler.trigger_now("missing").await,
            Err(AppError::NotFound(_))
        ));
    }
}
