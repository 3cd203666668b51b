use ferrogate_core::{GatewayClient, HistoricalRange, RequestOptions};

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(
    args: &HistoryArgs,
    client: &GatewayClient,
    options: &RequestOptions,
) -> Result<CommandResult, CliError> {
    let range = HistoricalRange::parse(args.from.as_deref(), args.to.as_deref())?;
    let series = client.historical_with(&args.symbol, range, options).await?;
    Ok(CommandResult::ok(serde_json::to_value(series)?))
}
