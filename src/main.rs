// Toolgate - tool execution gateway
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use toolgate::commands::{default_registry, Dispatcher};
use toolgate::config::load_config;
use toolgate::server;
use toolgate::services::{
    GoogleCalendar, HttpMailer, OptivendiDirectory, ServiceContext, SmsApiGateway,
    SundeaDirectory,
};

#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(about = "Tool execution gateway for the phone assistant", version)]
struct Args {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let bind_address = args.bind.unwrap_or_else(|| config.bind_address.clone());

    let calendar = GoogleCalendar::new(
        config.google.token_path.clone(),
        config.google.api_base_url.clone(),
    );
    let sms = SmsApiGateway::new(config.sms.base_url.clone(), config.sms.token.clone());
    let mail = HttpMailer::new(
        config.mail.base_url.clone(),
        config.mail.token.clone(),
        config.mail.from.clone(),
    );
    let sundea = SundeaDirectory::open(
        &config.directories.sundea_path,
        config.directories.max_connections,
    )
    .context("Failed to open Sundea directory")?;
    let optivendi = OptivendiDirectory::open(
        &config.directories.optivendi_path,
        config.directories.max_connections,
    )
    .context("Failed to open Optivendi directory")?;

    // Directory problems surface at startup, not on the first lookup
    if let Err(e) = sundea.ping().await {
        warn!(error = ?e, "Sundea directory check failed");
    }
    if let Err(e) = optivendi.ping().await {
        warn!(error = ?e, "Optivendi directory check failed");
    }

    let ctx = ServiceContext {
        calendar: Arc::new(calendar),
        sms: Arc::new(sms),
        mail: Arc::new(mail),
        sundea: Arc::new(sundea),
        optivendi: Arc::new(optivendi),
        routes: config.calendars.clone(),
        policy: config.validation,
        defaults: config.event_defaults.clone(),
    };

    let dispatcher = Dispatcher::new(default_registry()?, ctx);
    server::serve(Arc::new(dispatcher), &bind_address).await
}
