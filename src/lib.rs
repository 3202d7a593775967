// Toolgate - tool execution gateway
// Library exports

pub mod commands;
pub mod config;
pub mod server;
pub mod services;
