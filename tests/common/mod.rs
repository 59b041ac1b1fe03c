#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stockmonitor::config::MonitorSettings;
use stockmonitor::error::NotifyError;
use stockmonitor::models::{StartMonitor, ThresholdRule};
use stockmonitor::services::monitor::MonitorManager;
use stockmonitor::services::monitor_registry::TaskRegistry;
use stockmonitor::services::notify::NotificationSink;
use stockmonitor::services::price_feed::PriceFeed;

/// Feed that replays a script of prices, then repeats the last entry.
pub struct ScriptedFeed {
    script: Mutex<VecDeque<Option<f64>>>,
    last: Mutex<Option<f64>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new(script: Vec<Option<f64>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn constant(price: f64) -> Arc<Self> {
        Self::new(vec![Some(price)])
    }

    /// Every fetch sleeps `delay` (tokio time) before answering.
    pub fn slow(price: f64, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(vec![Some(price)].into()),
            last: Mutex::new(None),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceFeed for ScriptedFeed {
    async fn fetch_price(&self, _ticker: &str) -> Option<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(p) => {
                *last = p;
                p
            }
            None => *last,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sent {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Sink that records every message and can be told to fail or to stall.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Sent>>,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    /// Every send sleeps `delay` (tokio time) before the message is recorded.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }

        self.sent.lock().unwrap().push(Sent {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });

        if self.fail {
            return Err(NotifyError::Transport("smtp down".to_string()));
        }
        Ok(())
    }
}

pub fn manager(feed: Arc<ScriptedFeed>, sink: Arc<RecordingSink>) -> MonitorManager {
    MonitorManager::new(
        Arc::new(TaskRegistry::new()),
        feed,
        sink,
        MonitorSettings::default(),
    )
}

pub fn params(conversation_id: &str, rule: ThresholdRule) -> StartMonitor {
    StartMonitor {
        conversation_id: conversation_id.to_string(),
        user_id: "u1".to_string(),
        notify_target: "trader@example.com".to_string(),
        ticker: "aapl".to_string(),
        rule,
        poll_interval_seconds: Some(60.0),
        duration_minutes: Some(1.0),
    }
}

pub fn every(conversation_id: &str, rule: ThresholdRule, secs: f64, minutes: f64) -> StartMonitor {
    StartMonitor {
        poll_interval_seconds: Some(secs),
        duration_minutes: Some(minutes),
        ..params(conversation_id, rule)
    }
}
