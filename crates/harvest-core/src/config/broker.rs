//! Message broker configuration.

use serde::{Deserialize, Serialize};

/// Broker connection and queue naming configuration.
///
/// Both components own their connection independently; this section only
/// describes how to reach the broker and what the channels are called.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker provider type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Broker connection URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Name of the durable work queue.
    #[serde(default = "default_work_queue")]
    pub work_queue: String,
    /// Name of the durable dead-letter queue.
    #[serde(default = "default_dead_letter_queue")]
    pub dead_letter_queue: String,
    /// Key prefix for all Harvest broker keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Fixed delay between connection attempts, in seconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_seconds: u64,
    /// How long a single receive call blocks waiting for a message.
    #[serde(default = "default_receive_timeout")]
    pub receive_timeout_seconds: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: default_url(),
            work_queue: default_work_queue(),
            dead_letter_queue: default_dead_letter_queue(),
            key_prefix: default_key_prefix(),
            reconnect_delay_seconds: default_reconnect_delay(),
            receive_timeout_seconds: default_receive_timeout(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_work_queue() -> String {
    "tasks".to_string()
}

fn default_dead_letter_queue() -> String {
    "failed_tasks".to_string()
}

fn default_key_prefix() -> String {
    "harvest:".to_string()
}

fn default_reconnect_delay() -> u64 {
    3
}

fn default_receive_timeout() -> u64 {
    5
}
