//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod broker;
pub mod collector;
pub mod logging;
pub mod scheduler;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::broker::BrokerConfig;
use self::collector::CollectorConfig;
use self::logging::LoggingConfig;
use self::scheduler::SchedulerConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Message broker settings.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Tick scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Collector trigger settings.
    #[serde(default)]
    pub collector: CollectorConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `HARVEST`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HARVEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_contract() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.broker.work_queue, "tasks");
        assert_eq!(config.broker.dead_letter_queue, "failed_tasks");
        assert_eq!(config.broker.reconnect_delay_seconds, 3);
        assert_eq!(config.scheduler.interval_seconds, 30);
        assert_eq!(config.scheduler.job_type, "collect");
        assert_eq!(config.worker.max_attempts, 3);
    }
}
