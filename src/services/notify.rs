//! Notification delivery for triggered monitors.
//!
//! Real email delivery is not wired up yet; `MockMailer` keeps an in-memory
//! outbox and logs every message instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::NotifyError;

pub const DEFAULT_RECENT_LIMIT: usize = 50;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct MockEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MockMailer {
    outbox: Mutex<Vec<MockEmail>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last `limit` messages, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<MockEmail> {
        let outbox = self.outbox.lock();
        let start = outbox.len().saturating_sub(limit);
        outbox[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.outbox.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.lock().is_empty()
    }
}

#[async_trait]
impl NotificationSink for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if to.trim().is_empty() {
            return Err(NotifyError::Rejected("empty recipient".to_string()));
        }

        let email = MockEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: body.to_string(),
            sent_at: Utc::now(),
        };

        tracing::info!(to = %email.to, subject = %email.subject, "[mock-email] {}", email.text);
        self.outbox.lock().push(email);

        Ok(())
    }
}
