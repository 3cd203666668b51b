use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::ValidationError;

time::serde::format_description!(ymd_date, Date, "[year]-[month]-[day]");

/// Latest quote for a symbol as reported by `/v3/quote`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub changes_percentage: Option<f64>,
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub day_low: Option<f64>,
    #[serde(default)]
    pub day_high: Option<f64>,
    #[serde(default)]
    pub year_low: Option<f64>,
    #[serde(default)]
    pub year_high: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub avg_volume: Option<f64>,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub previous_close: Option<f64>,
    #[serde(default)]
    pub exchange: Option<String>,
    /// Unix seconds of the last trade.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Company metadata as reported by `/v3/profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub mkt_cap: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub exchange_short_name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub ceo: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub ipo_date: Option<String>,
}

/// One daily OHLCV row of a historical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalBar {
    #[serde(with = "ymd_date")]
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub adj_close: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub change_percent: Option<f64>,
}

/// Daily price history as reported by `/v3/historical-price-full`.
///
/// The provider returns bars newest first; the order is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub symbol: String,
    #[serde(default)]
    pub historical: Vec<HistoricalBar>,
}

/// Optional inclusive date bounds for a historical request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HistoricalRange {
    from: Option<Date>,
    to: Option<Date>,
}

impl HistoricalRange {
    pub fn new(from: Option<Date>, to: Option<Date>) -> Result<Self, ValidationError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ValidationError::InvertedRange {
                    from: format_date(from),
                    to: format_date(to),
                });
            }
        }
        Ok(Self { from, to })
    }

    /// Parse optional `YYYY-MM-DD` bounds.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, ValidationError> {
        Self::new(from.map(parse_date).transpose()?, to.map(parse_date).transpose()?)
    }

    pub const fn all() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    /// Query parameters understood by the historical endpoint.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);
        if let Some(from) = self.from {
            params.push(("from", format_date(from)));
        }
        if let Some(to) = self.to {
            params.push(("to", format_date(to)));
        }
        params
    }
}

impl Display for HistoricalRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let bound = |date: Option<Date>| date.map(format_date).unwrap_or_else(|| "*".to_owned());
        write!(f, "{}..{}", bound(self.from), bound(self.to))
    }
}

pub fn parse_date(value: &str) -> Result<Date, ValidationError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).map_err(|_| {
        ValidationError::InvalidDate {
            value: value.to_owned(),
        }
    })
}

fn format_date(date: Date) -> String {
    let (year, month, day) = (date.year(), u8::from(date.month()), date.day());
    format!("{year:04}-{month:02}-{day:02}")
}
