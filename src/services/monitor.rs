//! Per-conversation price monitors.
//!
//! Every monitor owns two tokio tasks: a poller that fetches a price every
//! interval and checks the rule, and a one-shot expiry timer. Both end up in
//! `stop`, which aborts the timers and purges the task from the registry.
//!
//! Lifecycle: `running` -> `triggered` | `expired` | `stopped`. Terminal
//! states never change again and a tick outside `running` does nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::config::MonitorSettings;
use crate::error::MonitorError;
use crate::models::{MonitorHit, MonitorStatus, MonitorTask, StartMonitor};

use super::monitor_registry::{MonitorHandle, TaskRegistry};
use super::notify::NotificationSink;
use super::price_feed::PriceFeed;
use super::rules;

pub const MONITORS_UPDATED: &str = "monitorsUpdated";

/// Published on every lifecycle change of a conversation's monitors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorEvent {
    pub conversation_id: String,
    // owner of the conversation; subscribers only see their own events
    #[serde(skip)]
    pub user_id: String,
}

impl MonitorEvent {
    pub fn is_for(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Task already left `running`; the poller should exit.
    Inactive,
    /// Feed had no price this tick.
    Unavailable,
    Miss { price: f64 },
    Triggered(MonitorHit),
}

#[derive(Clone)]
pub struct MonitorManager {
    registry: Arc<TaskRegistry>,
    feed: Arc<dyn PriceFeed>,
    sink: Arc<dyn NotificationSink>,
    settings: MonitorSettings,
    events_tx: Option<broadcast::Sender<MonitorEvent>>,
}

impl MonitorManager {
    pub fn new(
        registry: Arc<TaskRegistry>,
        feed: Arc<dyn PriceFeed>,
        sink: Arc<dyn NotificationSink>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            registry,
            feed,
            sink,
            settings,
            events_tx: None,
        }
    }

    /// Announce every lifecycle change on `events_tx`.
    pub fn with_events(mut self, events_tx: broadcast::Sender<MonitorEvent>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    fn publish(&self, conversation_id: &str, user_id: &str) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(MonitorEvent {
                conversation_id: conversation_id.to_string(),
                user_id: user_id.to_string(),
            });
        }
    }

    fn poll_interval(&self, seconds: Option<f64>) -> Result<Duration, MonitorError> {
        let secs = match seconds {
            None => self.settings.default_interval_secs,
            Some(s) if !s.is_finite() => {
                return Err(MonitorError::InvalidSchedule(
                    "intervalSeconds must be a finite number".to_string(),
                ))
            }
            Some(s) => s.floor().max(0.0) as u64,
        };
        // the ceiling keeps `Instant + period` from overflowing in the poller
        let floor = self.settings.min_interval_secs;
        let ceiling = self.settings.max_interval_secs.max(floor);
        // tokio intervals reject a zero period
        Ok(Duration::from_secs(secs.clamp(floor, ceiling).max(1)))
    }

    fn duration_minutes(&self, minutes: Option<f64>) -> Result<u64, MonitorError> {
        let max = self.settings.max_duration_min.max(1);
        let min = match minutes {
            None => self.settings.default_duration_min,
            Some(m) if !m.is_finite() => {
                return Err(MonitorError::InvalidSchedule(
                    "durationMinutes must be a finite number".to_string(),
                ))
            }
            Some(m) => m.floor().max(0.0) as u64,
        };
        Ok(min.clamp(1, max))
    }

    /// Create a monitor and arm its timers.
    pub async fn start(&self, params: StartMonitor) -> Result<MonitorHandle, MonitorError> {
        let ticker = params.ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(MonitorError::InvalidTicker);
        }
        params.rule.validate()?;
        let interval = self.poll_interval(params.poll_interval_seconds)?;
        let duration_min = self.duration_minutes(params.duration_minutes)?;

        let limit = self.settings.max_running_per_conversation;
        if self.registry.running_count(&params.conversation_id) >= limit {
            return Err(MonitorError::CapacityExceeded { limit });
        }

        let baseline_price = if params.rule.needs_baseline() {
            let baseline = self.feed.fetch_price(&ticker).await;
            if baseline.is_none() {
                tracing::warn!(ticker = %ticker, "no baseline price, percent-change monitor will not fire");
            }
            baseline
        } else {
            None
        };

        let lifetime = Duration::from_secs(duration_min * 60);
        let started_at = Utc::now();
        let expires_at = started_at + chrono::Duration::minutes(duration_min as i64);

        let task = MonitorTask {
            id: Uuid::new_v4().simple().to_string(),
            conversation_id: params.conversation_id.clone(),
            user_id: params.user_id.clone(),
            notify_target: params.notify_target,
            ticker,
            rule: params.rule,
            poll_interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            started_at,
            expires_at,
            status: MonitorStatus::Running,
            last_price: None,
            baseline_price,
            hits: Vec::new(),
        };

        let handle = MonitorHandle::new(task);

        // capacity is re-checked under the write lock; the baseline fetch above may have raced
        if !self.registry.try_insert(&params.conversation_id, handle.clone(), limit) {
            return Err(MonitorError::CapacityExceeded { limit });
        }

        let poll = self.spawn_poller(handle.clone(), interval);
        let expiry = self.spawn_expiry(
            handle.clone(),
            lifetime + Duration::from_millis(self.settings.expiry_grace_ms),
        );
        handle.arm(poll, expiry);

        tracing::info!(
            task_id = %handle.id(),
            conversation_id = %handle.conversation_id(),
            ticker = %handle.snapshot().ticker,
            rule = ?params.rule,
            interval_secs = interval.as_secs(),
            duration_min,
            "monitor started"
        );
        self.publish(&params.conversation_id, &params.user_id);

        Ok(handle)
    }

    fn spawn_poller(&self, handle: MonitorHandle, period: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match manager.poll_once(&handle).await {
                    PollOutcome::Inactive | PollOutcome::Triggered(_) => break,
                    PollOutcome::Unavailable | PollOutcome::Miss { .. } => {}
                }
            }
        })
    }

    fn spawn_expiry(&self, handle: MonitorHandle, after: Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            time::sleep(after).await;
            manager.expire(&handle);
        })
    }

    /// One tick: fetch, evaluate, and on a hit notify once and stop.
    pub async fn poll_once(&self, handle: &MonitorHandle) -> PollOutcome {
        let Some(ticker) = handle.with_task(|t| t.status.is_running().then(|| t.ticker.clone())) else {
            return PollOutcome::Inactive;
        };

        let Some(price) = self.feed.fetch_price(&ticker).await else {
            tracing::debug!(task_id = %handle.id(), ticker = %ticker, "price unavailable, skipping tick");
            return PollOutcome::Unavailable;
        };

        let fired = handle.with_task(|t| {
            // a stop may have landed while the fetch was in flight
            if !t.status.is_running() {
                return Err(PollOutcome::Inactive);
            }
            t.last_price = Some(price);

            if !rules::evaluate(&t.rule, price, t.baseline_price) {
                return Err(PollOutcome::Miss { price });
            }

            let hit = MonitorHit {
                time: Utc::now(),
                price,
                reason: rules::explain(&t.rule, price, t.baseline_price),
            };
            t.status = MonitorStatus::Triggered;
            t.hits.push(hit.clone());
            Ok((hit, t.notify_target.clone(), t.conversation_id.clone()))
        });

        let (hit, target, conversation_id) = match fired {
            Ok(v) => v,
            Err(outcome) => {
                tracing::debug!(task_id = %handle.id(), ticker = %ticker, ?outcome, "tick");
                return outcome;
            }
        };

        tracing::info!(
            task_id = %handle.id(),
            conversation_id = %conversation_id,
            ticker = %ticker,
            price,
            reason = %hit.reason,
            "monitor triggered"
        );

        let subject = format!("[Monitor Trigger] {ticker}");
        let body = format!(
            "conversation {conversation_id} | stock {ticker} | rule hit: {}",
            hit.reason
        );
        // detached so that cancelling the poller cannot drop a send in flight
        let sink = Arc::clone(&self.sink);
        let task_id = handle.id().to_string();
        tokio::spawn(async move {
            if let Err(e) = sink.send(&target, &subject, &body).await {
                tracing::warn!(task_id = %task_id, error = %e, "notification failed, not retrying");
            }
        });

        self.stop(&conversation_id, Some(handle.id()));
        PollOutcome::Triggered(hit)
    }

    /// Expiry timer body: mark expired if still running, then stop.
    pub fn expire(&self, handle: &MonitorHandle) {
        let expired = handle.with_task(|t| {
            if t.status.is_running() {
                t.status = MonitorStatus::Expired;
                true
            } else {
                false
            }
        });

        if expired {
            tracing::info!(
                task_id = %handle.id(),
                conversation_id = %handle.conversation_id(),
                "monitor expired"
            );
        }

        self.stop(handle.conversation_id(), Some(handle.id()));
    }

    /// Cancel one task, or every task of the conversation when `task_id` is `None`.
    ///
    /// Returns how many tasks were cancelled by this call. Idempotent.
    pub fn stop(&self, conversation_id: &str, task_id: Option<&str>) -> usize {
        let removed = match task_id {
            Some(id) => self.registry.remove(conversation_id, id).into_iter().collect(),
            None => self.registry.remove_all(conversation_id),
        };

        for handle in &removed {
            handle.cancel();
            tracing::info!(
                task_id = %handle.id(),
                conversation_id = %conversation_id,
                status = ?handle.status(),
                "monitor stopped"
            );
        }

        if let Some(first) = removed.first() {
            let user_id = first.with_task(|t| t.user_id.clone());
            self.publish(conversation_id, &user_id);
        }
        removed.len()
    }

    pub fn stop_all(&self, conversation_id: &str) -> usize {
        self.stop(conversation_id, None)
    }

    pub fn list_tasks(&self, conversation_id: &str) -> Vec<MonitorTask> {
        self.registry.list_by_conversation(conversation_id)
    }

    pub fn list_all_tasks(&self) -> Vec<MonitorTask> {
        self.registry.list_all()
    }
}
