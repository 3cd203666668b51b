//! CLI argument definitions for Ferrogate.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quote` | Fetch latest quotes for one or more symbols |
//! | `profile` | Fetch a company profile |
//! | `history` | Fetch daily price history |
//! | `status` | Show the configured rate limiter of a fresh process (always a full bucket) |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | none | JSON configuration file |
//! | `--base-url` | provider default | Override the upstream base URL |
//! | `--timeout-ms` | `10000` | Per-attempt timeout in ms |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `-v` | off | Debug logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! # Several quotes share one rate limiter
//! ferrogate quote AAPL MSFT NVDA --pretty
//!
//! # History for January
//! ferrogate history AAPL --from 2024-01-01 --to 2024-01-31
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Rate-limited market data gateway.
///
/// Reads the API key from FMP_API_KEY (or the config file) and routes every
/// request through a shared token bucket with retry and backoff.
#[derive(Debug, Parser)]
#[command(name = "ferrogate", author, version, about = "Rate-limited market data gateway")]
pub struct Cli {
    /// JSON configuration file (camelCase keys).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the upstream base URL.
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Per-attempt timeout in milliseconds.
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Enable debug logging on stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch latest quotes.
    Quote(QuoteArgs),
    /// Fetch a company profile.
    Profile(ProfileArgs),
    /// Fetch daily price history.
    History(HistoryArgs),
    /// Show the configured rate limiter (always a full bucket).
    ///
    /// Each invocation builds a new client, so the bucket reported is the
    /// configured capacity at full strength. Tokens spent by earlier
    /// invocations are not remembered. Nothing is sent upstream and no token
    /// is spent.
    Status,
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// Ticker symbols, e.g. AAPL MSFT.
    #[arg(required = true)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub symbol: String,

    /// First day to include (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<String>,

    /// Last day to include (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<String>,
}
