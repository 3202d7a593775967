// Command dispatcher
//
// Looks up the handler for a command name, invokes it, and wraps the
// outcome in the transport-level envelope. No failure escapes dispatch:
// everything the caller sees is a structured result or error mapping.

use crate::commands::registry::CommandRegistry;
use crate::services::ServiceContext;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

pub struct Dispatcher {
    registry: CommandRegistry,
    ctx: ServiceContext,
}

impl Dispatcher {
    pub fn new(registry: CommandRegistry, ctx: ServiceContext) -> Self {
        Self { registry, ctx }
    }

    /// Dispatch one invocation.
    ///
    /// Returns `{"result": <handler envelope>}` when a handler ran to
    /// completion (its envelope may itself carry a validation or
    /// collaborator error), or a top-level `{"error": ...}` for unknown
    /// command names and unexpected handler failures.
    #[instrument(skip(self, params), fields(command = %command))]
    pub async fn dispatch(&self, command: &str, params: Value) -> Value {
        info!(params = %params, "Dispatching command");

        let Some(handler) = self.registry.get(command) else {
            warn!("Unknown command");
            return json!({ "error": format!("Unknown tool: {command}") });
        };

        match handler.run(params, &self.ctx).await {
            Ok(envelope) => json!({ "result": envelope }),
            Err(e) => {
                error!(error = ?e, "Command failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn command_names(&self) -> Vec<String> {
        self.registry.command_names()
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }
}
