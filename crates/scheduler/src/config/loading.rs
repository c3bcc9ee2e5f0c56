use std::path::Path;

use tracing::warn;

use crate::error::SchedulerError;

use super::SchedulerConfig;

impl SchedulerConfig {
    /// Parse and validate config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, SchedulerError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Full startup load: `.env`, optional file, environment overrides, validation.
    pub fn load(path: Option<&Path>) -> Result<Self, SchedulerError> {
        dotenvy::dotenv().ok();

        let mut config: Self = match path {
            Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply `DTS_*` environment variable overrides.
    ///
    /// - `DTS_HOST` -> `host`
    /// - `DTS_PORT` -> `port`
    /// - `DTS_BACKOFF_MS` -> `backoff_ms`
    /// - `DTS_SELECTION` -> `selection`
    /// - `DTS_HTTP_ENABLED` -> `http.enabled`
    /// - `DTS_HTTP_PORT` -> `http.port`
    /// - `DTS_RESULT_TTL_SECS` -> `results.ttl_secs`
    /// - `DTS_SWEEP_INTERVAL_SECS` -> `results.sweep_interval_secs`
    /// - `DTS_METRICS_LOG_INTERVAL_SECS` -> `metrics_log_interval_secs`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Unparsable values are
    /// logged and skipped.
    pub(crate) fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DTS_HOST") {
            self.host = v;
        }
        override_parsed(&lookup, "DTS_PORT", &mut self.port);
        override_parsed(&lookup, "DTS_BACKOFF_MS", &mut self.backoff_ms);
        override_parsed(&lookup, "DTS_SELECTION", &mut self.selection);
        override_parsed(&lookup, "DTS_HTTP_ENABLED", &mut self.http.enabled);
        override_parsed(&lookup, "DTS_HTTP_PORT", &mut self.http.port);
        if let Some(v) = lookup("DTS_RESULT_TTL_SECS") {
            match v.parse::<u64>() {
                Ok(secs) => self.results.ttl_secs = Some(secs),
                Err(_) => warn!(key = "DTS_RESULT_TTL_SECS", value = %v, "ignoring unparsable override"),
            }
        }
        override_parsed(
            &lookup,
            "DTS_SWEEP_INTERVAL_SECS",
            &mut self.results.sweep_interval_secs,
        );
        override_parsed(
            &lookup,
            "DTS_METRICS_LOG_INTERVAL_SECS",
            &mut self.metrics_log_interval_secs,
        );
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(v) = lookup(key) {
        match v.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(key, value = %v, "ignoring unparsable override"),
        }
    }
}
