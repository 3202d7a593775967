// Command registry and trait definition
//
// Manages the fixed catalogue of commands and provides a uniform
// invocation interface

use crate::commands::types::{CommandDefinition, Envelope, InputSchema};
use crate::services::ServiceContext;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Command trait - every dispatchable operation implements this
///
/// A command owns its input contract: it validates the raw params and
/// returns Envelope::Error for anything malformed before touching a
/// collaborator. An Err return is reserved for unexpected failures and is
/// converted to the outer error envelope by the dispatcher.
#[async_trait]
pub trait Command: Send + Sync {
    /// Command name (e.g., "send_sms", "get_calendar_events")
    fn name(&self) -> &str;

    /// Human-readable description of what the command does
    fn description(&self) -> &str;

    /// JSON Schema describing the expected input parameters
    fn input_schema(&self) -> InputSchema;

    /// Validate params and invoke the collaborator
    async fn run(&self, params: Value, ctx: &ServiceContext) -> Result<Envelope>;

    /// Get the full command definition (for the agent runtime)
    fn definition(&self) -> CommandDefinition {
        CommandDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Registry of available commands
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a command. Registering a duplicate name is a configuration
    /// error and fails fast at startup.
    pub fn register(&mut self, command: Box<dyn Command>) -> Result<()> {
        let name = command.name().to_string();
        if self.commands.contains_key(&name) {
            bail!("Command '{}' is already registered", name);
        }
        self.commands.insert(name, command);
        Ok(())
    }

    /// Get command by name
    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|b| b.as_ref())
    }

    /// Check if a command exists
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// List all command names
    pub fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    /// Get all command definitions (for the agent runtime)
    pub fn definitions(&self) -> Vec<CommandDefinition> {
        self.commands.values().map(|c| c.definition()).collect()
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the registry with the full command catalogue.
pub fn default_registry() -> Result<CommandRegistry> {
    use crate::commands::calendar::{CreateCalendarEvent, GetCalendarEvents, GetSingleCalendarEvent};
    use crate::commands::customers::{GetClientDetails, GetClientInstallationDetails};
    use crate::commands::notification::{SendEmail, SendSms};

    let mut registry = CommandRegistry::new();
    registry.register(Box::new(GetCalendarEvents))?;
    registry.register(Box::new(GetSingleCalendarEvent))?;
    registry.register(Box::new(CreateCalendarEvent))?;
    registry.register(Box::new(SendSms))?;
    registry.register(Box::new(SendEmail))?;
    registry.register(Box::new(GetClientDetails))?;
    registry.register(Box::new(GetClientInstallationDetails))?;
    Ok(registry)
}
