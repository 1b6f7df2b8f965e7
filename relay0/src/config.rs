//! Configuration record for the orchestration core.
//!
//! The core reads no environment variables and parses no CLI — the
//! embedder constructs a [`CoreConfig`] and hands it in.

use crate::duration::DurationMs;
use serde::{Deserialize, Serialize};

/// Log severity levels. The core emits through `tracing`; this value is
/// surfaced so the embedder can configure its subscriber to match.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Finest-grained tracing.
    Trace,
    /// Debug-level detail.
    Debug,
    /// Informational messages.
    Info,
    /// Warnings.
    Warn,
    /// Errors.
    Error,
}

/// Token-bucket rate limiting configuration, applied per tool name.
/// Plainly constructible — the embedder builds this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether the registry rate-limits tool calls at all.
    pub enabled: bool,
    /// Burst size — a fresh bucket holds this many tokens.
    pub capacity: u32,
    /// Continuous refill rate, tokens per second.
    pub refill_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 10,
            refill_per_second: 1.0,
        }
    }
}

/// Configuration for a complete orchestration core.
/// Plainly constructible — the embedder builds this record, usually
/// from `CoreConfig::default()` with a few overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// How many tasks may run concurrently. Zero means nothing is ever
    /// dispatched — tasks stay pending.
    pub max_concurrent_tasks: usize,
    /// Timeout for message delivery when the message carries none.
    pub default_message_timeout: DurationMs,
    /// Retry budget for tasks that don't specify one.
    pub default_max_retries: u32,
    /// Period of the agent health-check timer. Zero disables it.
    pub health_check_interval: DurationMs,
    /// Log level the embedder should configure its subscriber to.
    pub log_level: LogLevel,
    /// Per-tool rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Capacity of the bounded message history.
    pub history_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 4,
            default_message_timeout: DurationMs::from_secs(30),
            default_max_retries: 3,
            health_check_interval: DurationMs::from_secs(60),
            log_level: LogLevel::Info,
            rate_limit: RateLimitConfig::default(),
            history_capacity: 1000,
        }
    }
}
