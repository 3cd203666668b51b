use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use ferrogate_core::{ErrorCategory, GatewayClient, GatewayError, Quote, RequestOptions};

use crate::cli::QuoteArgs;
use crate::error::{gateway_exit_code, CliError};

use super::CommandResult;

#[derive(Debug, Serialize)]
struct QuoteResponseData {
    quotes: Vec<Quote>,
    errors: Vec<QuoteFailure>,
}

#[derive(Debug, Serialize)]
struct QuoteFailure {
    symbol: String,
    code: &'static str,
    category: ErrorCategory,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    attempts: u32,
}

impl QuoteFailure {
    fn new(symbol: String, error: &GatewayError) -> Self {
        Self {
            symbol,
            code: error.code(),
            category: error.category(),
            message: error.to_string(),
            status: error.status(),
            attempts: error.attempts(),
        }
    }
}

/// Fetches every symbol concurrently through the shared client; each symbol
/// is its own logical call and spends its own admission token.
pub async fn run(
    args: &QuoteArgs,
    client: Arc<GatewayClient>,
    options: RequestOptions,
) -> Result<CommandResult, CliError> {
    let mut tasks = JoinSet::new();
    for (index, symbol) in args.symbols.iter().cloned().enumerate() {
        let client = Arc::clone(&client);
        let options = options.clone();
        tasks.spawn(async move {
            let result = client.quote_with(&symbol, &options).await;
            (index, symbol, result)
        });
    }

    let mut results = Vec::with_capacity(args.symbols.len());
    while let Some(joined) = tasks.join_next().await {
        results.push(joined?);
    }
    results.sort_by_key(|(index, _, _)| *index);

    let mut quotes = Vec::new();
    let mut errors = Vec::new();
    let mut exit_code = 0;
    for (_, symbol, result) in results {
        match result {
            Ok(quote) => quotes.push(quote),
            Err(error) => {
                if exit_code == 0 {
                    exit_code = gateway_exit_code(error.category());
                }
                errors.push(QuoteFailure::new(symbol, &error));
            }
        }
    }

    let data = serde_json::to_value(QuoteResponseData { quotes, errors })?;
    Ok(CommandResult::ok(data).with_exit_code(exit_code))
}
