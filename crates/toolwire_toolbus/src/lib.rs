pub mod error;
pub mod tools;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::task::{Context, Poll};
use std::time::Instant;

use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use toolwire_core::{ToolInfo, ToolOutcome, now_millis};
use tracing::{debug, warn};

pub use error::{Result, ToolbusError};
pub use tools::{
    Bash, BashArgs, BashError, BashExecutor, Delay, DelayArgs, Echo, InvalidParams, Tool,
    ToolOutput, ToolResult, builtin_tool, builtin_tool_names, default_timeout, parse_params,
};

const EVENT_CAPACITY: usize = 64;

/// Aborts the spawned tool when the caller stops waiting for it.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = std::result::Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Lifecycle notifications, published inside the mutating call.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Registered { name: String, replaced: bool },
    Unregistered { name: String },
    Used { name: String, usage_count: u64, last_used: i64 },
}

struct Entry {
    tool: Arc<dyn Tool>,
    enabled: bool,
    usage_count: u64,
    last_used: Option<i64>,
}

impl Entry {
    fn new(tool: Arc<dyn Tool>) -> Self {
        Self {
            tool,
            enabled: true,
            usage_count: 0,
            last_used: None,
        }
    }

    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.tool.name().to_string(),
            description: self.tool.description().to_string(),
            parameters: self.tool.parameters_schema(),
            enabled: self.enabled,
            usage_count: self.usage_count,
            last_used: self.last_used,
        }
    }
}

/// Catalog of invocable tools with per-tool usage stats.
///
/// One registry per server run; it is shared as `Arc<ToolRegistry>` between
/// the accept loop and every connection task.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Entry>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tools: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Builds a registry holding the given tools.
    pub fn with_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let registry = Self::new();
        for tool in tools {
            registry.register_arc(tool);
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.tools.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.tools.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: RegistryEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    pub fn register<T: Tool + 'static>(&self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Stores a tool under its name. Re-registering a name replaces the
    /// previous tool and resets its stats.
    pub fn register_arc(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let replaced = self.write().insert(name.clone(), Entry::new(tool)).is_some();
        if replaced {
            warn!(tool = %name, "Tool already registered, replacing it");
        } else {
            debug!(tool = %name, "Registered tool");
        }
        self.publish(RegistryEvent::Registered { name, replaced });
    }

    /// Removes a tool and its stats. Returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.write().remove(name).is_some();
        if removed {
            debug!(tool = %name, "Unregistered tool");
            self.publish(RegistryEvent::Unregistered {
                name: name.to_string(),
            });
        } else {
            warn!(tool = %name, "Cannot unregister unknown tool");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.read().get(name).map(|e| Arc::clone(&e.tool))
    }

    pub fn has(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn info(&self, name: &str) -> Option<ToolInfo> {
        self.read().get(name).map(Entry::info)
    }

    /// Enables or disables a tool. Returns `false` if the tool is unknown.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.write().get_mut(name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Wire-facing view of every tool, sorted by name.
    pub fn list_all(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<ToolInfo> = self.read().values().map(Entry::info).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Bumps the usage count and last-used time. No-op for unknown tools,
    /// which happens when a tool is unregistered while a call is in flight.
    pub fn record_usage(&self, name: &str) {
        let now = now_millis();
        let usage_count = {
            let mut tools = self.write();
            let Some(entry) = tools.get_mut(name) else {
                debug!(tool = %name, "Usage for unregistered tool ignored");
                return;
            };
            entry.usage_count += 1;
            entry.last_used = Some(now);
            entry.usage_count
        };
        self.publish(RegistryEvent::Used {
            name: name.to_string(),
            usage_count,
            last_used: now,
        });
    }

    /// Runs a tool and records its usage.
    ///
    /// The tool body runs on its own task so a panic surfaces as
    /// [`ToolbusError::ExecutionFailed`] instead of unwinding into the caller.
    /// The returned outcome carries the elapsed execution time.
    pub async fn call(&self, tool_name: &str, params: JsonValue) -> Result<ToolOutcome> {
        let tool = {
            let tools = self.read();
            let entry = tools
                .get(tool_name)
                .ok_or_else(|| ToolbusError::NotFound(tool_name.to_string()))?;
            if !entry.enabled {
                return Err(ToolbusError::Disabled(tool_name.to_string()));
            }
            Arc::clone(&entry.tool)
        };

        let start = Instant::now();
        let joined = AbortOnDrop(tokio::spawn(async move { tool.execute(params).await })).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let outcome = match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) if e.is::<InvalidParams>() => {
                return Err(ToolbusError::InvalidParameters {
                    tool: tool_name.to_string(),
                    message: e.to_string(),
                });
            }
            Ok(Err(e)) => {
                return Err(ToolbusError::ExecutionFailed {
                    tool: tool_name.to_string(),
                    message: e.to_string(),
                });
            }
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    "tool panicked".to_string()
                } else {
                    "tool task was cancelled".to_string()
                };
                return Err(ToolbusError::ExecutionFailed {
                    tool: tool_name.to_string(),
                    message,
                });
            }
        };

        self.record_usage(tool_name);
        Ok(outcome.with_execution_time(duration_ms))
    }
}
