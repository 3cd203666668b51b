mod history;
mod profile;
mod quote;
mod status;

use std::sync::Arc;
use std::time::Duration;

use ferrogate_core::{CancellationToken, GatewayClient, GatewayConfig, RequestOptions};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Rendered payload plus the exit code it implies.
pub struct CommandResult {
    pub data: Value,
    pub exit_code: u8,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self { data, exit_code: 0 }
    }

    pub fn with_exit_code(mut self, exit_code: u8) -> Self {
        self.exit_code = exit_code;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let config = load_config(cli)?;
    tracing::debug!(?config, "configuration resolved");
    let client = Arc::new(GatewayClient::new(config)?);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; cancelling in-flight calls");
            interrupt.cancel();
        }
    });
    let options = RequestOptions::default().with_cancellation(cancel);

    match &cli.command {
        Command::Quote(args) => quote::run(args, client, options).await,
        Command::Profile(args) => profile::run(args, &client, &options).await,
        Command::History(args) => history::run(args, &client, &options).await,
        Command::Status => status::run(&client),
    }
}

fn load_config(cli: &Cli) -> Result<GatewayConfig, CliError> {
    let mut config = GatewayConfig::load(cli.config.as_deref(), |key| std::env::var(key).ok())?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout = Duration::from_millis(timeout_ms);
    }
    config.validate()?;
    Ok(config)
}
