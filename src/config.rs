use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub finnhub_api_key: String,

    pub monitor: MonitorSettings,
}

/// Limits and timing defaults for price monitors.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Running monitors allowed per conversation at the same time.
    pub max_running_per_conversation: usize,

    pub default_interval_secs: u64,
    pub min_interval_secs: u64,
    /// Longer requested intervals are cut down to this.
    pub max_interval_secs: u64,

    pub default_duration_min: u64,
    pub max_duration_min: u64,

    /// Added to the monitor lifetime before the expiry timer fires.
    pub expiry_grace_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            max_running_per_conversation: 3,
            default_interval_secs: 30,
            min_interval_secs: 5,
            max_interval_secs: 86_400,
            default_duration_min: 30,
            max_duration_min: 30,
            expiry_grace_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "stockchat".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env_or("PORT", 3000u16);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-dev-secret".to_string());
    let finnhub_api_key = env::var("FINNHUB_API_KEY").unwrap_or_default();

    let defaults = MonitorSettings::default();
    let monitor = MonitorSettings {
        max_running_per_conversation: env_or("MONITOR_MAX_RUNNING", defaults.max_running_per_conversation),
        default_interval_secs: env_or("MONITOR_DEFAULT_INTERVAL_SECS", defaults.default_interval_secs),
        min_interval_secs: env_or("MONITOR_MIN_INTERVAL_SECS", defaults.min_interval_secs),
        max_interval_secs: env_or("MONITOR_MAX_INTERVAL_SECS", defaults.max_interval_secs),
        default_duration_min: env_or("MONITOR_DEFAULT_DURATION_MIN", defaults.default_duration_min),
        max_duration_min: env_or("MONITOR_MAX_DURATION_MIN", defaults.max_duration_min),
        expiry_grace_ms: env_or("MONITOR_EXPIRY_GRACE_MS", defaults.expiry_grace_ms),
    };

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        jwt_secret,
        finnhub_api_key,
        monitor,
    }
}
