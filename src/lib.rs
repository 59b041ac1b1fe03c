//! Library entrypoint for StockMonitor.
//!
//! The binary only wires settings, MongoDB and the router together; everything
//! else lives here so integration tests under `tests/` can reach the monitor
//! manager, controllers and routers directly.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

use services::{
    finnhub::FinnhubClient,
    monitor::{MonitorEvent, MonitorManager},
    monitor_registry::TaskRegistry,
    notify::MockMailer,
};

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub monitor: MonitorManager,
    pub events_tx: tokio::sync::broadcast::Sender<MonitorEvent>,
}

impl AppState {
    /// Wire the monitor manager to Finnhub prices and the mock mailer.
    pub fn new(db: mongodb::Database, settings: config::Settings) -> Self {
        let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<MonitorEvent>(64);

        let feed = Arc::new(FinnhubClient::new(settings.finnhub_api_key.clone()));
        let monitor = MonitorManager::new(
            Arc::new(TaskRegistry::new()),
            feed,
            Arc::new(MockMailer::new()),
            settings.monitor.clone(),
        )
        .with_events(events_tx.clone());

        AppState {
            db,
            settings,
            monitor,
            events_tx,
        }
    }
}
