//! Ambient engine configuration, loaded from the environment via
//! `dotenvy`, falling back to built-in defaults.

use std::time::Duration;

/// Engine-wide defaults that apply when a chain or task is silent about
/// them. None of this is chain-definition state — it configures *this
/// engine instance*, not any one execution.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Used when a task omits `timeout`.
    pub default_task_timeout: Duration,
    /// Bound the inspector trims persisted trace lists to
    pub trace_retention_bound: u64,
    /// Deadline for a single KV persistence call
    pub kv_operation_deadline: Duration,
    /// Used when a chain omits `routingStrategy`.
    pub default_routing_strategy: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_task_timeout: Duration::from_secs(30),
            trace_retention_bound: crate::inspector::TRACE_RETENTION_BOUND,
            kv_operation_deadline: crate::inspector::KV_OPERATION_DEADLINE,
            default_routing_strategy: None,
        }
    }
}

impl EngineConfig {
    /// Loads overrides from the process environment (optionally via a
    /// `.env` file, consulted first if present). Unset variables fall
    /// back to [`EngineConfig::default`].
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("CHAINFORGE_DEFAULT_TASK_TIMEOUT_SECS") {
            if let Ok(secs) = raw.parse::<u64>() {
                config.default_task_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = std::env::var("CHAINFORGE_TRACE_RETENTION_BOUND") {
            if let Ok(bound) = raw.parse::<u64>() {
                config.trace_retention_bound = bound;
            }
        }
        if let Ok(raw) = std::env::var("CHAINFORGE_KV_OPERATION_DEADLINE_SECS") {
            if let Ok(secs) = raw.parse::<u64>() {
                config.kv_operation_deadline = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = std::env::var("CHAINFORGE_DEFAULT_ROUTING_STRATEGY") {
            config.default_routing_strategy = Some(raw);
        }

        config
    }
}
