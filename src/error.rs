use thiserror::Error;

/// Failures reported to the caller of `MonitorManager::start`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    #[error("This conversation has reached the limit of {limit} running monitors")]
    CapacityExceeded { limit: usize },

    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("invalid ticker: symbol must not be empty")]
    InvalidTicker,

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification rejected: {0}")]
    Rejected(String),

    #[error("notification transport failed: {0}")]
    Transport(String),
}
