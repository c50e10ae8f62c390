//! Tool executor: validate, dispatch, and bound each call with a timeout.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::nasa::{self, TechTransferSearch};
use super::{calculator, ToolError, ToolInvocation, ToolRegistry};

/// Per-call timeout used when none is configured.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs tool calls for the conversation loop.
///
/// Every outcome is a `Result<Value, ToolError>`: unknown names, schema violations,
/// transport failures and timeouts all come back as [`ToolError`] so one bad tool call
/// cannot take down the turn that issued it.
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    search: Option<Arc<dyn TechTransferSearch>>,
    timeout: Duration,
}

impl ToolExecutor {
    /// Executor without a search backend; NASA tools fail with an execution error.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            search: None,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn TechTransferSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Schema-checks `input` for the named tool without running it.
    pub fn validate(&self, name: &str, input: &Value) -> Result<ToolInvocation, ToolError> {
        self.registry.validate(name, input)
    }

    /// Validates and runs one tool call.
    pub async fn execute(&self, name: &str, input: &Value) -> Result<Value, ToolError> {
        let invocation = self.validate(name, input)?;
        self.execute_validated(invocation).await
    }

    /// Runs an already validated call under the per-call timeout.
    pub async fn execute_validated(&self, invocation: ToolInvocation) -> Result<Value, ToolError> {
        let name = invocation.kind().name();
        tracing::debug!(tool = name, "executing tool");
        match tokio::time::timeout(self.timeout, self.dispatch(invocation)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(tool = name, timeout = ?self.timeout, "tool call timed out");
                Err(ToolError::Timeout {
                    tool: name.to_string(),
                    after: self.timeout,
                })
            }
        }
    }

    async fn dispatch(&self, invocation: ToolInvocation) -> Result<Value, ToolError> {
        let kind = invocation.kind();
        match invocation {
            ToolInvocation::Add(i) => calculator::add(&i),
            ToolInvocation::Subtract(i) => calculator::subtract(&i),
            ToolInvocation::Multiply(i) => calculator::multiply(&i),
            ToolInvocation::Divide(i) => calculator::divide(&i),
            ToolInvocation::SearchPatents(i)
            | ToolInvocation::SearchSoftware(i)
            | ToolInvocation::SearchSpinoffs(i) => {
                let backend = self.search.as_deref().ok_or_else(|| {
                    ToolError::Execution(format!("{}: search backend not configured", kind.name()))
                })?;
                let category = kind.search_category().ok_or_else(|| {
                    ToolError::Execution(format!("{} is not a search tool", kind.name()))
                })?;
                nasa::search(backend, category, &i).await
            }
        }
    }
}
