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

//! Suggestion-cursor encoding: URL-safe base64 of a JSON
//! `[score, source_symbol, target_symbol]` array.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;

use crate::error::{RegistryError, RegistryResult};

/// Encode a pagination cursor from the last returned row.
pub fn encode_cursor(score: f64, src_sym: &str, tgt_sym: &str) -> String {
  let payload = serde_json::json!([score, src_sym, tgt_sym]);
  URL_SAFE.encode(payload.to_string())
}

/// Decode a pagination cursor back into `(score, source_symbol, target_symbol)`.
pub fn decode_cursor(cursor: &str) -> RegistryResult<(f64, String, String)> {
  let invalid = |detail: String| RegistryError::Validation(format!("Invalid cursor format: {detail}"));

  let raw = URL_SAFE.decode(cursor).map_err(|e| invalid(e.to_string()))?;
  let value: serde_json::Value = serde_json::from_slice(&raw).map_err(|e| invalid(e.to_string()))?;
  let parts = value.as_array().ok_or_else(|| invalid("expected a JSON array".to_string()))?;
  if parts.len() != 3 {
    return Err(invalid(format!("expected 3 elements, got {}", parts.len())));
  }
  let score = parts[0].as_f64().ok_or_else(|| invalid("score is not a number".to_string()))?;
  let src = parts[1].as_str().ok_or_else(|| invalid("source symbol is not a string".to_string()))?;
  let tgt = parts[2].as_str().ok_or_else(|| invalid("target symbol is not a string".to_string()))?;
  Ok((score, src.to_string(), tgt.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_round_trip() {
    let cursor = encode_cursor(82.5, "AAPL.US", "AAPL");
    let (score, src, tgt) = decode_cursor(&cursor).unwrap();
    assert_eq!(score, 82.5);
    assert_eq!(src, "AAPL.US");
    assert_eq!(tgt, "AAPL");
  }

  #[test]
  fn test_round_trip_unicode_and_special_characters() {
    let cursor = encode_cursor(30.0, "BTC/USD", "DAIMLER AG NA O.N. ä→");
    let (score, src, tgt) = decode_cursor(&cursor).unwrap();
    assert_eq!(score, 30.0);
    assert_eq!(src, "BTC/USD");
    assert_eq!(tgt, "DAIMLER AG NA O.N. ä→");
  }

  #[test]
  fn test_garbage_is_rejected() {
    assert!(decode_cursor("not base64 at all!!").is_err());
    // Valid base64, invalid payload
    let b64 = URL_SAFE.encode(b"{\"not\": \"an array\"}");
    assert!(decode_cursor(&b64).is_err());
    let short = URL_SAFE.encode(b"[1.0]");
    assert!(decode_cursor(&short).is_err());
  }
}
