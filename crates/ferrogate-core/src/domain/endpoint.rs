use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::Symbol;

/// Upstream operation exposed by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Quote,
    Profile,
    Historical,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Profile => "profile",
            Self::Historical => "historical",
        }
    }

    /// Provider path for the given symbol, relative to the configured base URL.
    pub fn path(self, symbol: &Symbol) -> String {
        let prefix = match self {
            Self::Quote => "/v3/quote",
            Self::Profile => "/v3/profile",
            Self::Historical => "/v3/historical-price-full",
        };
        format!("{prefix}/{}", urlencoding::encode(symbol.as_str()))
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
