//! # Domain Models
//!
//! Typed payloads returned by the gateway and the validated inputs it accepts.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated, upper-cased ticker |
//! | [`Endpoint`] | Upstream operation (quote, profile, historical) |
//! | [`Quote`] | Latest quote snapshot |
//! | [`CompanyProfile`] | Company metadata |
//! | [`HistoricalSeries`] | Daily OHLCV history |
//! | [`HistoricalRange`] | Optional `from`/`to` bounds for history |
//!
//! Upstream payload types are lenient: only the fields the gateway relies on
//! are required, everything else is optional.

mod endpoint;
mod models;
mod symbol;

pub use endpoint::Endpoint;
pub use models::{
    parse_date, CompanyProfile, HistoricalBar, HistoricalRange, HistoricalSeries, Quote,
};
pub use symbol::Symbol;
