//! Per-endpoint response shape checks.
//!
//! Each decoder returns `Ok(None)` for a well-formed but empty answer, which
//! the gateway reports as not-found, and `Err` for a body it cannot trust.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{CompanyProfile, HistoricalSeries, Quote};

pub(crate) type Decoded<T> = Result<Option<T>, String>;

pub(crate) fn decode_quote(body: &str) -> Decoded<Quote> {
    first_element(body)
}

pub(crate) fn decode_profile(body: &str) -> Decoded<CompanyProfile> {
    first_element(body)
}

pub(crate) fn decode_historical(body: &str) -> Decoded<HistoricalSeries> {
    match parse(body)? {
        Value::Null => Ok(None),
        Value::Object(map) => {
            let has_rows = map
                .get("historical")
                .and_then(Value::as_array)
                .is_some_and(|rows| !rows.is_empty());
            if !has_rows {
                return Ok(None);
            }
            serde_json::from_value(Value::Object(map))
                .map(Some)
                .map_err(|error| format!("unexpected historical series shape: {error}"))
        }
        other => Err(format!("expected a JSON object, got {}", describe(&other))),
    }
}

fn first_element<T: DeserializeOwned>(body: &str) -> Decoded<T> {
    match parse(body)? {
        Value::Null => Ok(None),
        Value::Array(items) => match items.into_iter().next() {
            None | Some(Value::Null) => Ok(None),
            Some(first) => serde_json::from_value(first)
                .map(Some)
                .map_err(|error| format!("unexpected element shape: {error}")),
        },
        other => Err(format!("expected a JSON array, got {}", describe(&other))),
    }
}

fn parse(body: &str) -> Result<Value, String> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|error| format!("response is not valid JSON: {error}"))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
