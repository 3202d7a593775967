// Command dispatch system
//
// Registry of named operations, shared validators, and the dispatcher that
// wraps every outcome in the uniform result/error envelope.

pub mod calendar;
pub mod customers;
pub mod dispatcher;
pub mod notification;
pub mod registry;
pub mod types;
pub mod validate;

pub use dispatcher::Dispatcher;
pub use registry::{default_registry, Command, CommandRegistry};
pub use types::{CommandDefinition, Envelope, InputSchema};
