use ferrogate_core::{GatewayClient, RequestOptions};

use crate::cli::ProfileArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(
    args: &ProfileArgs,
    client: &GatewayClient,
    options: &RequestOptions,
) -> Result<CommandResult, CliError> {
    let profile = client.profile_with(&args.symbol, options).await?;
    Ok(CommandResult::ok(serde_json::to_value(profile)?))
}
