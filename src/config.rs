//! Server configuration loaded from environment variables

use std::time::Duration;

/// Connection hub tuning
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Outbound messages buffered per connection before it is dropped as too slow
    pub send_buffer: usize,
    /// How often the writer pings the peer. Must be less than `pong_wait`.
    pub ping_period: Duration,
    /// How long to wait for a pong before declaring the peer dead
    pub pong_wait: Duration,
    /// Time allowed to write a single frame
    pub write_wait: Duration,
    /// Largest inbound frame accepted from a peer
    pub max_message_bytes: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        let pong_wait = Duration::from_secs(60);
        Self {
            send_buffer: 256,
            ping_period: pong_wait * 9 / 10,
            pong_wait,
            write_wait: Duration::from_secs(10),
            max_message_bytes: 512,
        }
    }
}

impl HubConfig {
    /// Load hub config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let pong_wait = env_secs("HUB_PONG_WAIT_SECS").unwrap_or(defaults.pong_wait);

        // pong_wait is at least 1s, so 9/10 of it is never zero
        let mut ping_period = env_secs("HUB_PING_SECS").unwrap_or(pong_wait * 9 / 10);
        if ping_period >= pong_wait {
            tracing::warn!(
                "HUB_PING_SECS ({:?}) must be less than HUB_PONG_WAIT_SECS ({:?}), clamping",
                ping_period,
                pong_wait
            );
            ping_period = pong_wait * 9 / 10;
        }

        Self {
            send_buffer: env_parse("HUB_SEND_BUFFER")
                .map(|n: usize| n.max(1))
                .unwrap_or(defaults.send_buffer),
            ping_period,
            pong_wait,
            write_wait: env_secs("HUB_WRITE_WAIT_SECS").unwrap_or(defaults.write_wait),
            max_message_bytes: env_parse("HUB_MAX_MESSAGE_BYTES")
                .unwrap_or(defaults.max_message_bytes),
        }
    }
}

/// Top-level application config
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Join cap for operatives on a single team
    pub max_operatives_per_team: usize,
    pub hub: HubConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_operatives_per_team: 10,
            hub: HubConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            max_operatives_per_team: env_parse("MAX_OPERATIVES_PER_TEAM")
                .unwrap_or(defaults.max_operatives_per_team),
            hub: HubConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Whole seconds from the environment. Zero is ignored, since the hub's
/// timers cannot run on an empty period.
fn env_secs(key: &str) -> Option<Duration> {
    env_parse(key)
        .filter(|&n: &u64| n > 0)
        .map(Duration::from_secs)
}
