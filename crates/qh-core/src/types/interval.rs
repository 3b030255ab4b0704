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

//! Bar interval vocabulary and alias normalization.

use serde::{Deserialize, Serialize};

/// Data bar interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
  #[serde(rename = "1min")]
  Min1,
  #[serde(rename = "5min")]
  Min5,
  #[serde(rename = "15min")]
  Min15,
  #[serde(rename = "30min")]
  Min30,
  #[serde(rename = "1h")]
  Hour1,
  #[serde(rename = "4h")]
  Hour4,
  #[serde(rename = "1d")]
  Day1,
  #[serde(rename = "1w")]
  Week1,
  #[serde(rename = "1M")]
  Month1,
}

/// Canonical interval strings, shortest to longest.
pub const INTERVALS: [&str; 9] = ["1min", "5min", "15min", "30min", "1h", "4h", "1d", "1w", "1M"];

// Lower-case alias -> canonical value
const INTERVAL_ALIASES: [(&str, &str); 2] = [("daily", "1d"), ("one_minute", "1min")];

impl std::fmt::Display for Interval {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl Interval {
  pub fn as_str(&self) -> &'static str {
    match self {
      Interval::Min1 => "1min",
      Interval::Min5 => "5min",
      Interval::Min15 => "15min",
      Interval::Min30 => "30min",
      Interval::Hour1 => "1h",
      Interval::Hour4 => "4h",
      Interval::Day1 => "1d",
      Interval::Week1 => "1w",
      Interval::Month1 => "1M",
    }
  }

  /// Parse interval from its canonical string
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "1min" => Some(Interval::Min1),
      "5min" => Some(Interval::Min5),
      "15min" => Some(Interval::Min15),
      "30min" => Some(Interval::Min30),
      "1h" => Some(Interval::Hour1),
      "4h" => Some(Interval::Hour4),
      "1d" => Some(Interval::Day1),
      "1w" => Some(Interval::Week1),
      "1M" => Some(Interval::Month1),
      _ => None,
    }
  }

  /// Get intraday interval duration in minutes, None for 1d and coarser
  pub fn minutes(&self) -> Option<u32> {
    match self {
      Interval::Min1 => Some(1),
      Interval::Min5 => Some(5),
      Interval::Min15 => Some(15),
      Interval::Min30 => Some(30),
      Interval::Hour1 => Some(60),
      Interval::Hour4 => Some(240),
      _ => None,
    }
  }
}

/// Normalize an interval string to its canonical form.
///
/// Canonical values keep their exact casing (`1M` stays monthly); aliases
/// like `daily` resolve to `1d`. Unknown values are returned lower-cased for
/// the caller to reject. Empty input becomes `None`.
pub fn normalize_interval(value: Option<&str>) -> Option<String> {
  let v = value?.trim();
  if v.is_empty() {
    return None;
  }
  let v_lower = v.to_lowercase();
  for (alias, canonical) in INTERVAL_ALIASES {
    if v_lower == alias {
      return Some(canonical.to_string());
    }
  }
  for canonical in INTERVALS {
    if v_lower == canonical.to_lowercase() {
      return Some(canonical.to_string());
    }
  }
  Some(v_lower)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_normalize_aliases() {
    assert_eq!(normalize_interval(Some("daily")).as_deref(), Some("1d"));
    assert_eq!(normalize_interval(Some("one_minute")).as_deref(), Some("1min"));
  }

  #[test]
  fn test_normalize_monthly_keeps_canonical_casing() {
    assert_eq!(normalize_interval(Some("1m")).as_deref(), Some("1M"));
    assert_eq!(normalize_interval(Some("1M")).as_deref(), Some("1M"));
    assert_eq!(normalize_interval(Some("1MIN")).as_deref(), Some("1min"));
  }

  #[test]
  fn test_normalize_unknown_lowercased() {
    assert_eq!(normalize_interval(Some("2H")).as_deref(), Some("2h"));
  }

  #[test]
  fn test_every_canonical_value_round_trips() {
    for name in INTERVALS {
      let parsed = Interval::from_str(name).expect(name);
      assert_eq!(parsed.as_str(), name);
    }
  }

  #[test]
  fn test_minutes() {
    assert_eq!(Interval::Min5.minutes(), Some(5));
    assert_eq!(Interval::Hour4.minutes(), Some(240));
    assert_eq!(Interval::Day1.minutes(), None);
  }
}
