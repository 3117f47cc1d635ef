use std::str::FromStr;
use std::time::Duration;

/// Process-level settings from the environment. Provider settings live in the store instead.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub batch_size: i64,
    pub concurrency: usize,
    pub http_timeout: Duration,
    pub fetch_interval: Duration,
    pub process_interval: Duration,
    pub scheduled_batch_size: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            batch_size: 10,
            concurrency: 3,
            http_timeout: Duration::from_secs(60),
            fetch_interval: Duration::from_secs(30 * 60),
            process_interval: Duration::from_secs(10 * 60),
            scheduled_batch_size: 5,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable or non-positive numbers keep their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(url) = get("DATABASE_URL").filter(|u| !u.trim().is_empty()) {
            cfg.database_url = Some(url);
        }
        if let Some(n) = positive(&get, "DIGEST_BATCH_SIZE") { cfg.batch_size = n; }
        if let Some(n) = positive(&get, "DIGEST_CONCURRENCY") { cfg.concurrency = n; }
        if let Some(n) = positive(&get, "DIGEST_HTTP_TIMEOUT_SECS") { cfg.http_timeout = Duration::from_secs(n); }
        if let Some(n) = positive(&get, "DIGEST_FETCH_INTERVAL_SECS") { cfg.fetch_interval = Duration::from_secs(n); }
        if let Some(n) = positive(&get, "DIGEST_PROCESS_INTERVAL_SECS") { cfg.process_interval = Duration::from_secs(n); }
        if let Some(n) = positive(&get, "DIGEST_SCHEDULED_BATCH_SIZE") { cfg.scheduled_batch_size = n; }
        cfg
    }
}

// Out-of-range input fails to parse for the target type.
fn positive<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    get(key)?.trim().parse::<T>().ok().filter(|n| *n > T::default())
}
