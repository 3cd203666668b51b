use ferrogate_core::GatewayClient;

use crate::error::CliError;

use super::CommandResult;

pub fn run(client: &GatewayClient) -> Result<CommandResult, CliError> {
    Ok(CommandResult::ok(serde_json::to_value(
        client.limiter_status(),
    )?))
}
