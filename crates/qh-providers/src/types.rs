/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Provider primitives: bars, requests, symbol payloads, and type tags.

use chrono::{DateTime, NaiveDate, Utc};
use qh_core::Interval;
use serde::{Deserialize, Serialize};

/// One OHLCV bar. `ts` is the end-time of the bar, `sym` the provider symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
  pub ts: DateTime<Utc>,
  pub sym: String,
  pub o: f64,
  pub h: f64,
  pub l: f64,
  pub c: f64,
  pub v: f64,
}

/// A historical data request for one symbol over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Req {
  pub sym: String,
  pub start: NaiveDate,
  pub end: NaiveDate,
  pub interval: Interval,
}

/// Symbol discovery payload returned by `get_available_symbols`.
///
/// `asset_class` is the provider's raw label; normalization to the canonical
/// vocabulary happens in the Registry's asset-update pipeline. When both
/// `primary_id` and `provider_id` are present, `primary_id` wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
  pub provider: String,
  #[serde(default)]
  pub provider_id: Option<String>,
  #[serde(default)]
  pub primary_id: Option<String>,
  #[serde(default)]
  pub isin: Option<String>,
  pub symbol: String,
  #[serde(default)]
  pub matcher_symbol: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub exchange: Option<String>,
  #[serde(default)]
  pub asset_class: Option<String>,
  #[serde(default)]
  pub base_currency: Option<String>,
  #[serde(default)]
  pub quote_currency: Option<String>,
  #[serde(default)]
  pub country: Option<String>,
}

/// One index constituent as reported by an index provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
  pub symbol: String,
  #[serde(default)]
  pub weight: Option<f64>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub asset_class: Option<String>,
  #[serde(default)]
  pub matcher_symbol: Option<String>,
  #[serde(default)]
  pub base_currency: Option<String>,
  #[serde(default)]
  pub quote_currency: Option<String>,
}

/// Provider capability category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
  Historical,
  Realtime,
  Index,
}

impl std::fmt::Display for ProviderType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ProviderType::Historical => write!(f, "historical"),
      ProviderType::Realtime => write!(f, "realtime"),
      ProviderType::Index => write!(f, "index"),
    }
  }
}

impl ProviderType {
  /// Bar table the dispatcher writes into, None for index providers.
  pub fn bar_table(&self) -> Option<&'static str> {
    match self {
      ProviderType::Historical => Some("historical_data"),
      ProviderType::Realtime => Some("live_data"),
      ProviderType::Index => None,
    }
  }
}

/// `code_registry.class_subtype` values for provider-class rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderSubtype {
  Historical,
  Live,
  IndexProvider,
  UserIndex,
}

impl std::fmt::Display for ProviderSubtype {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl ProviderSubtype {
  pub fn as_str(&self) -> &'static str {
    match self {
      ProviderSubtype::Historical => "Historical",
      ProviderSubtype::Live => "Live",
      ProviderSubtype::IndexProvider => "IndexProvider",
      ProviderSubtype::UserIndex => "UserIndex",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "Historical" => Some(ProviderSubtype::Historical),
      "Live" => Some(ProviderSubtype::Live),
      "IndexProvider" => Some(ProviderSubtype::IndexProvider),
      "UserIndex" => Some(ProviderSubtype::UserIndex),
      _ => None,
    }
  }

  pub fn provider_type(&self) -> Option<ProviderType> {
    match self {
      ProviderSubtype::Historical => Some(ProviderType::Historical),
      ProviderSubtype::Live => Some(ProviderType::Realtime),
      ProviderSubtype::IndexProvider => Some(ProviderType::Index),
      ProviderSubtype::UserIndex => None,
    }
  }
}

/// Token bucket shape: `calls` requests per `per_seconds` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
  pub calls: u32,
  pub per_seconds: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_symbol_info_deserializes_sparse_payload() {
    let json = r#"{"provider": "MockFeed", "symbol": "AAPL"}"#;
    let info: SymbolInfo = serde_json::from_str(json).unwrap();
    assert_eq!(info.provider, "MockFeed");
    assert_eq!(info.symbol, "AAPL");
    assert!(info.primary_id.is_none());
    assert!(info.exchange.is_none());
  }

  #[test]
  fn test_provider_type_bar_table() {
    assert_eq!(ProviderType::Historical.bar_table(), Some("historical_data"));
    assert_eq!(ProviderType::Realtime.bar_table(), Some("live_data"));
    assert_eq!(ProviderType::Index.bar_table(), None);
  }

  #[test]
  fn test_subtype_round_trip() {
    for s in ["Historical", "Live", "IndexProvider", "UserIndex"] {
      assert_eq!(ProviderSubtype::from_str(s).unwrap().as_str(), s);
    }
    assert!(ProviderSubtype::from_str("Broker").is_none());
  }
}
