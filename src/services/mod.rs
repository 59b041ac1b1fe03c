pub mod finnhub;
pub mod db_init;

pub mod price_feed;
pub mod notify;
pub mod rules;
pub mod monitor_registry;
pub mod monitor;

pub mod conversation_service;
