#![deny(missing_docs)]
//! Tool adapter registry for relay.
//!
//! [`AdapterRegistry`] owns the set of registered [`ToolAdapter`]s and
//! fronts every call with the fixed pipeline the tool server promises
//! its clients: lookup, per-tool rate limiting, declarative schema
//! validation, the adapter's own validation, then a timed and
//! panic-isolated execute. Tool-level failures are always returned as
//! [`ToolResult`] values with stable error codes — a misbehaving
//! adapter cannot take the registry down.

pub mod limiter;
pub mod schema;

pub use limiter::{RateDecision, RateLimiter, RateStatus};
pub use schema::{validate_args, SchemaViolation};

use relay0::config::RateLimitConfig;
use relay0::error::RegistryError;
use relay0::tool::{
    AdapterContext, ErrorCode, ToolAdapter, ToolDefinition, ToolFailure, ToolResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A snapshot of the registry's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of registered adapters.
    pub total_adapters: usize,
    /// Registered tool names, sorted.
    pub tool_names: Vec<String>,
}

/// Registry of tool adapters, keyed by tool name.
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<String, Arc<dyn ToolAdapter>>>,
    limiter: Option<RateLimiter>,
}

impl AdapterRegistry {
    /// Create a registry with rate limiting per the given config.
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiter = config
            .enabled
            .then(|| RateLimiter::new(config.capacity, config.refill_per_second));
        Self {
            adapters: RwLock::new(HashMap::new()),
            limiter,
        }
    }

    /// Create a registry with rate limiting disabled.
    pub fn unlimited() -> Self {
        Self {
            adapters: RwLock::new(HashMap::new()),
            limiter: None,
        }
    }

    /// Register an adapter under the name from its tool definition.
    /// A second registration under the same name fails.
    pub async fn register(&self, adapter: Arc<dyn ToolAdapter>) -> Result<(), RegistryError> {
        let name = adapter.definition().name;
        let mut adapters = self.adapters.write().await;
        if adapters.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        debug!(tool = %name, "adapter registered");
        adapters.insert(name, adapter);
        Ok(())
    }

    /// Remove an adapter, calling its `shutdown` first. Idempotent —
    /// unknown names are ignored, and shutdown failures are logged,
    /// never propagated.
    pub async fn unregister(&self, name: &str) {
        let removed = self.adapters.write().await.remove(name);
        if let Some(adapter) = removed {
            if let Err(e) = adapter.shutdown().await {
                warn!(tool = %name, error = %e, "adapter shutdown failed during unregister");
            }
            debug!(tool = %name, "adapter unregistered");
        }
    }

    /// Initialize every registered adapter concurrently. All
    /// initializations run to completion; the first failure (if any)
    /// is returned after the rest have settled.
    pub async fn initialize_all(&self, ctx: &AdapterContext) -> Result<(), RegistryError> {
        let adapters: Vec<(String, Arc<dyn ToolAdapter>)> = {
            let map = self.adapters.read().await;
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        let mut handles = Vec::with_capacity(adapters.len());
        for (name, adapter) in adapters {
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                (name.clone(), adapter.initialize(ctx).await)
            }));
        }

        let mut first_failure = None;
        for handle in handles {
            match handle.await {
                Ok((_, Ok(()))) => {}
                Ok((name, Err(e))) => {
                    warn!(tool = %name, error = %e, "adapter initialization failed");
                    first_failure.get_or_insert(RegistryError::InitFailed {
                        tool: name,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    first_failure.get_or_insert(RegistryError::InitFailed {
                        tool: "<unknown>".to_owned(),
                        message: e.to_string(),
                    });
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Shut down every adapter concurrently, then clear the registry.
    /// The first failure is returned after all have settled; the
    /// registry is cleared regardless, so a repeat call is a no-op.
    pub async fn shutdown_all(&self) -> Result<(), RegistryError> {
        let adapters: Vec<(String, Arc<dyn ToolAdapter>)> = {
            let mut map = self.adapters.write().await;
            map.drain().collect()
        };

        let mut handles = Vec::with_capacity(adapters.len());
        for (name, adapter) in adapters {
            handles.push(tokio::spawn(
                async move { (name.clone(), adapter.shutdown().await) },
            ));
        }

        let mut first_failure = None;
        for handle in handles {
            match handle.await {
                Ok((_, Ok(()))) => {}
                Ok((name, Err(e))) => {
                    warn!(tool = %name, error = %e, "adapter shutdown failed");
                    first_failure.get_or_insert(RegistryError::ShutdownFailed {
                        tool: name,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    first_failure.get_or_insert(RegistryError::ShutdownFailed {
                        tool: "<unknown>".to_owned(),
                        message: e.to_string(),
                    });
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Execute a tool call through the full pipeline.
    pub async fn execute_tool(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &AdapterContext,
    ) -> ToolResult {
        // 1. Lookup.
        let Some(adapter) = self.adapter(name).await else {
            return ToolResult::failure(
                ToolFailure::new(ErrorCode::ToolNotFound, format!("tool not found: {name}"))
                    .unrecoverable()
                    .with_remediation("pick a registered tool from the definitions list"),
            );
        };

        // 2. Rate limit.
        if let Some(limiter) = &self.limiter {
            if let RateDecision::Denied { retry_after_secs } = limiter.check(name) {
                debug!(tool = %name, retry_after_secs, "tool call rate limited");
                return ToolResult::failure(
                    ToolFailure::new(
                        ErrorCode::RateLimited,
                        format!(
                            "rate limit exceeded for {name}: retry in {retry_after_secs}s"
                        ),
                    )
                    .with_details(serde_json::json!({"retry_after_secs": retry_after_secs}))
                    .with_remediation(format!(
                        "wait {retry_after_secs} seconds before calling {name} again"
                    )),
                );
            }
        }

        // 3. Declared schema, then the adapter's own validation.
        if let Err(violation) = validate_args(&adapter.definition().input_schema, &args) {
            return ToolResult::failure(
                ToolFailure::new(ErrorCode::InvalidParams, violation.message)
                    .with_details(violation.details),
            );
        }
        if let Some(verdict) = adapter.validate(&args) {
            if !verdict.valid {
                let mut failure = ToolFailure::new(
                    ErrorCode::InvalidParams,
                    verdict
                        .error
                        .unwrap_or_else(|| "invalid arguments".to_owned()),
                );
                if let Some(details) = verdict.details {
                    failure = failure.with_details(details);
                }
                return ToolResult::failure(failure);
            }
        }

        // 4. Timed, panic-isolated execute.
        let estimate = adapter.estimate_tokens(&args);
        let started = Instant::now();
        let exec_ctx = ctx.clone();
        let handle = tokio::spawn(async move { adapter.execute(args, exec_ctx).await });
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %name, error = %e, "adapter execution aborted");
                return ToolResult::failure(ToolFailure::new(
                    ErrorCode::ToolExecutionError,
                    format!("tool {name} failed: {e}"),
                ));
            }
        };

        // 5. Backfill metadata the adapter left unset.
        match result {
            ToolResult::Success { payload, mut meta } => {
                if meta.duration_ms.is_none() {
                    meta.duration_ms = Some(started.elapsed().as_millis() as u64);
                }
                if meta.tokens.is_none() {
                    meta.tokens = estimate;
                }
                ToolResult::Success { payload, meta }
            }
            failure => failure,
        }
    }

    /// Definitions of every registered tool, sorted by name.
    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        let adapters = self.adapters.read().await;
        let mut defs: Vec<ToolDefinition> =
            adapters.values().map(|a| a.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Whether a tool is registered.
    pub async fn has_tool(&self, name: &str) -> bool {
        self.adapters.read().await.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub async fn tool_names(&self) -> Vec<String> {
        let adapters = self.adapters.read().await;
        let mut names: Vec<String> = adapters.keys().cloned().collect();
        names.sort();
        names
    }

    /// The adapter behind a tool name, if registered.
    pub async fn adapter(&self, name: &str) -> Option<Arc<dyn ToolAdapter>> {
        self.adapters.read().await.get(name).cloned()
    }

    /// A snapshot of the registry's contents.
    pub async fn stats(&self) -> RegistryStats {
        let tool_names = self.tool_names().await;
        RegistryStats {
            total_adapters: tool_names.len(),
            tool_names,
        }
    }

    /// Current rate-limit status per tool. Empty when limiting is
    /// disabled or no tool has been called yet.
    pub fn rate_limit_status(&self) -> HashMap<String, RateStatus> {
        self.limiter
            .as_ref()
            .map(RateLimiter::status)
            .unwrap_or_default()
    }

    /// Restore one tool's bucket to full capacity.
    pub fn reset_rate_limit(&self, name: &str) {
        if let Some(limiter) = &self.limiter {
            limiter.reset(name);
        }
    }

    /// Drop all rate-limit buckets.
    pub fn reset_all_rate_limits(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.reset_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay0::test_utils::{EchoAdapter, StubContext};
    use serde_json::json;

    fn ctx() -> AdapterContext {
        AdapterContext {
            sender: None,
            context: Arc::new(StubContext::new()),
        }
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = AdapterRegistry::unlimited();
        registry.register(Arc::new(EchoAdapter)).await.unwrap();

        assert!(registry.has_tool("mock_echo").await);
        assert!(!registry.has_tool("nonexistent").await);
        assert_eq!(registry.tool_names().await, vec!["mock_echo"]);
        assert_eq!(registry.stats().await.total_adapters, 1);
    }

    #[tokio::test]
    async fn duplicate_registration_fails() {
        let registry = AdapterRegistry::unlimited();
        registry.register(Arc::new(EchoAdapter)).await.unwrap();

        let err = registry.register(Arc::new(EchoAdapter)).await.unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = AdapterRegistry::unlimited();
        registry.register(Arc::new(EchoAdapter)).await.unwrap();

        registry.unregister("mock_echo").await;
        assert!(!registry.has_tool("mock_echo").await);
        registry.unregister("mock_echo").await;
        registry.unregister("never-existed").await;
    }

    #[tokio::test]
    async fn execute_echoes() {
        let registry = AdapterRegistry::unlimited();
        registry.register(Arc::new(EchoAdapter)).await.unwrap();

        let result = registry
            .execute_tool("mock_echo", json!({"message": "hi"}), &ctx())
            .await;
        let ToolResult::Success { payload, meta } = result else {
            panic!("expected success");
        };
        assert_eq!(payload, json!({"echo": "hi"}));
        assert!(meta.duration_ms.is_some());
        assert!(meta.tokens.is_some());
    }

    #[tokio::test]
    async fn unknown_tool_is_unrecoverable() {
        let registry = AdapterRegistry::unlimited();
        let result = registry.execute_tool("nope", json!({}), &ctx()).await;
        let error = result.error().unwrap();
        assert_eq!(error.code, ErrorCode::ToolNotFound);
        assert!(!error.recoverable);
    }

    #[tokio::test]
    async fn definitions_are_sorted() {
        let registry = AdapterRegistry::unlimited();
        registry.register(Arc::new(EchoAdapter)).await.unwrap();
        let defs = registry.definitions().await;
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "mock_echo");
    }
}
