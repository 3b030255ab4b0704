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

//! Asset class vocabulary and alias normalization.

use serde::{Deserialize, Serialize};

/// Canonical asset class of a tradable symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
  Equity,
  Fund,
  Etf,
  Bond,
  Crypto,
  Currency,
  Future,
  Option,
  Index,
  Commodity,
  Derivative,
  Cfd,
  Warrant,
  Adr,
  Preferred,
  MutualFund,
  MoneyMarket,
  Rates,
  Mbs,
  Muni,
  StructuredProduct,
}

/// Canonical asset class strings, in declaration order.
pub const ASSET_CLASSES: [&str; 21] = [
  "equity",
  "fund",
  "etf",
  "bond",
  "crypto",
  "currency",
  "future",
  "option",
  "index",
  "commodity",
  "derivative",
  "cfd",
  "warrant",
  "adr",
  "preferred",
  "mutual_fund",
  "money_market",
  "rates",
  "mbs",
  "muni",
  "structured_product",
];

// Lower-case alias -> canonical value
const ASSET_CLASS_ALIASES: [(&str, &str); 9] = [
  ("adr_pref", "preferred"),
  ("bond_etf", "etf"),
  ("futures", "future"),
  ("fx", "currency"),
  ("index_option", "option"),
  ("mmf", "money_market"),
  ("perp", "future"),
  ("perps", "future"),
  ("stock", "equity"),
];

impl std::fmt::Display for AssetClass {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl AssetClass {
  pub fn as_str(&self) -> &'static str {
    match self {
      AssetClass::Equity => "equity",
      AssetClass::Fund => "fund",
      AssetClass::Etf => "etf",
      AssetClass::Bond => "bond",
      AssetClass::Crypto => "crypto",
      AssetClass::Currency => "currency",
      AssetClass::Future => "future",
      AssetClass::Option => "option",
      AssetClass::Index => "index",
      AssetClass::Commodity => "commodity",
      AssetClass::Derivative => "derivative",
      AssetClass::Cfd => "cfd",
      AssetClass::Warrant => "warrant",
      AssetClass::Adr => "adr",
      AssetClass::Preferred => "preferred",
      AssetClass::MutualFund => "mutual_fund",
      AssetClass::MoneyMarket => "money_market",
      AssetClass::Rates => "rates",
      AssetClass::Mbs => "mbs",
      AssetClass::Muni => "muni",
      AssetClass::StructuredProduct => "structured_product",
    }
  }

  /// Parse a canonical asset class string
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "equity" => Some(AssetClass::Equity),
      "fund" => Some(AssetClass::Fund),
      "etf" => Some(AssetClass::Etf),
      "bond" => Some(AssetClass::Bond),
      "crypto" => Some(AssetClass::Crypto),
      "currency" => Some(AssetClass::Currency),
      "future" => Some(AssetClass::Future),
      "option" => Some(AssetClass::Option),
      "index" => Some(AssetClass::Index),
      "commodity" => Some(AssetClass::Commodity),
      "derivative" => Some(AssetClass::Derivative),
      "cfd" => Some(AssetClass::Cfd),
      "warrant" => Some(AssetClass::Warrant),
      "adr" => Some(AssetClass::Adr),
      "preferred" => Some(AssetClass::Preferred),
      "mutual_fund" => Some(AssetClass::MutualFund),
      "money_market" => Some(AssetClass::MoneyMarket),
      "rates" => Some(AssetClass::Rates),
      "mbs" => Some(AssetClass::Mbs),
      "muni" => Some(AssetClass::Muni),
      "structured_product" => Some(AssetClass::StructuredProduct),
      _ => None,
    }
  }
}

/// Coarse partition used by the identity matcher and automated mapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClassGroup {
  Securities,
  Crypto,
}

impl std::fmt::Display for AssetClassGroup {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      AssetClassGroup::Securities => write!(f, "securities"),
      AssetClassGroup::Crypto => write!(f, "crypto"),
    }
  }
}

impl AssetClassGroup {
  pub fn as_str(&self) -> &'static str {
    match self {
      AssetClassGroup::Securities => "securities",
      AssetClassGroup::Crypto => "crypto",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "securities" => Some(AssetClassGroup::Securities),
      "crypto" => Some(AssetClassGroup::Crypto),
      _ => None,
    }
  }
}

/// Normalize an asset class string to its canonical form.
///
/// Trims and lower-cases the input, translates known aliases
/// (e.g. `stock` -> `equity`, `fx` -> `currency`), and returns unknown
/// values lower-cased so strict validators can decide to reject them.
/// Empty input becomes `None`.
pub fn normalize_asset_class(value: Option<&str>) -> Option<String> {
  let v = value?.trim();
  if v.is_empty() {
    return None;
  }
  let v_lower = v.to_lowercase();
  for (alias, canonical) in ASSET_CLASS_ALIASES {
    if v_lower == alias {
      return Some(canonical.to_string());
    }
  }
  Some(v_lower)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_normalize_passes_canonical_through() {
    assert_eq!(normalize_asset_class(Some("equity")).as_deref(), Some("equity"));
    assert_eq!(normalize_asset_class(Some("Crypto")).as_deref(), Some("crypto"));
  }

  #[test]
  fn test_normalize_translates_aliases() {
    assert_eq!(normalize_asset_class(Some("stock")).as_deref(), Some("equity"));
    assert_eq!(normalize_asset_class(Some("FX")).as_deref(), Some("currency"));
    assert_eq!(normalize_asset_class(Some("perps")).as_deref(), Some("future"));
    assert_eq!(normalize_asset_class(Some("mmf")).as_deref(), Some("money_market"));
  }

  #[test]
  fn test_normalize_preserves_unknown_lowercased() {
    assert_eq!(normalize_asset_class(Some("Gemstone")).as_deref(), Some("gemstone"));
    assert!(!ASSET_CLASSES.contains(&"gemstone"));
  }

  #[test]
  fn test_normalize_empty_is_none() {
    assert_eq!(normalize_asset_class(Some("  ")), None);
    assert_eq!(normalize_asset_class(None), None);
  }

  #[test]
  fn test_every_canonical_value_round_trips() {
    for name in ASSET_CLASSES {
      let parsed = AssetClass::from_str(name).expect(name);
      assert_eq!(parsed.as_str(), name);
    }
  }
}
