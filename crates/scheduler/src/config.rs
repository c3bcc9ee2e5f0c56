use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::registry::SelectionPolicy;

mod loading;
mod validation;


// ── Top-level config ────────────────────────────────────────────────

/// Scheduler configuration.
///
/// Parsed from an optional `dts.toml`, then overridden by `DTS_*`
/// environment variables, then validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Address the worker listener binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the worker listener binds to (0 = ephemeral).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Pause after finding no worker for a task, in milliseconds.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Worker selection policy.
    #[serde(default)]
    pub selection: SelectionPolicy,

    /// HTTP submission API.
    #[serde(default)]
    pub http: HttpConfig,

    /// Result retention.
    #[serde(default)]
    pub results: ResultsConfig,

    /// Interval between metrics log lines in seconds (0 = disabled).
    #[serde(default = "default_metrics_log_interval")]
    pub metrics_log_interval_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    dts_wire::DEFAULT_PORT
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_metrics_log_interval() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            backoff_ms: default_backoff_ms(),
            selection: SelectionPolicy::default(),
            http: HttpConfig::default(),
            results: ResultsConfig::default(),
            metrics_log_interval_secs: default_metrics_log_interval(),
        }
    }
}

impl SchedulerConfig {
    /// `host:port` for the worker listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `host:port` for the HTTP API.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http.port)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn result_ttl(&self) -> Option<Duration> {
        self.results.ttl_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.results.sweep_interval_secs)
    }
}

// ── Section configs ─────────────────────────────────────────────────

/// HTTP section: task submission and result lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// `false` turns the API off entirely.
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,

    /// Port for the HTTP API. 0 binds an ephemeral port; it does not disable the API.
    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_http_enabled() -> bool {
    true
}

fn default_http_port() -> u16 {
    9002
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            port: default_http_port(),
        }
    }
}

/// Results section: how long completed results are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsConfig {
    /// Evict results this many seconds after they arrive. Unset = keep forever.
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// How often the eviction sweep runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: None,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}
