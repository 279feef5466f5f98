use crate::urgency::UrgencyPolicy;
use entity_actor::tracing::LogFormat;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub data_file: PathBuf,
    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub log_level: String,
    pub log_format: LogFormat,
    pub urgency_tick: Duration,
    pub sync_poll: Duration,
    pub kitchen_urgency_minutes: i64,
    pub delivery_urgency_minutes: i64,
    /// Mailbox capacity of each order actor.
    pub order_mailbox_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            data_file: PathBuf::from("./data/orders.json"),
            log_level: "info".into(),
            log_format: LogFormat::Compact,
            urgency_tick: Duration::from_secs(30),
            sync_poll: Duration::from_secs(15),
            kitchen_urgency_minutes: 15,
            delivery_urgency_minutes: 20,
            order_mailbox_size: 32,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_port: env_parse("HTTP_PORT").unwrap_or(defaults.http_port),
            data_file: std::env::var("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: env_parse("LOG_FORMAT").unwrap_or(defaults.log_format),
            urgency_tick: env_parse("URGENCY_TICK_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.urgency_tick),
            sync_poll: env_parse("SYNC_POLL_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sync_poll),
            kitchen_urgency_minutes: env_parse("KITCHEN_URGENCY_MINUTES")
                .unwrap_or(defaults.kitchen_urgency_minutes),
            delivery_urgency_minutes: env_parse("DELIVERY_URGENCY_MINUTES")
                .unwrap_or(defaults.delivery_urgency_minutes),
            order_mailbox_size: env_parse("ORDER_MAILBOX_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.order_mailbox_size),
        }
    }

    pub fn urgency_policy(&self) -> UrgencyPolicy {
        UrgencyPolicy::from_minutes(self.kitchen_urgency_minutes, self.delivery_urgency_minutes)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.urgency_policy(), UrgencyPolicy::default());
        assert_eq!(config.order_mailbox_size, 32);
    }
}
