use super::SchedulerConfig;
use crate::error::SchedulerError;

impl SchedulerConfig {
    /// Validate the config.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        self.validate_host()?;
        self.validate_backoff()?;
        self.validate_ports()?;
        self.validate_results()?;
        Ok(())
    }

    fn validate_host(&self) -> Result<(), SchedulerError> {
        if self.host.trim().is_empty() {
            return Err(SchedulerError::Config("host must not be empty".into()));
        }
        Ok(())
    }

    fn validate_backoff(&self) -> Result<(), SchedulerError> {
        if self.backoff_ms == 0 {
            return Err(SchedulerError::Config(
                "backoff_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// The HTTP API and the worker listener cannot share a fixed port.
    fn validate_ports(&self) -> Result<(), SchedulerError> {
        if self.http.enabled && self.port != 0 && self.http.port == self.port {
            return Err(SchedulerError::Config(format!(
                "http.port {} collides with the worker port",
                self.http.port
            )));
        }
        Ok(())
    }

    fn validate_results(&self) -> Result<(), SchedulerError> {
        if self.results.ttl_secs == Some(0) {
            return Err(SchedulerError::Config(
                "results.ttl_secs must be greater than zero when set".into(),
            ));
        }
        if self.results.ttl_secs.is_some() && self.results.sweep_interval_secs == 0 {
            return Err(SchedulerError::Config(
                "results.sweep_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
